use feelhid::backends::hid::HidapiDevice;
use feelhid::matcher::{build_match_criteria, criteria_to_json};
use feelhid::usage::usage_name;
use feelhid::{resolve_default, RawDevice};
use hidapi::HidApi;
use std::rc::Rc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let criteria = build_match_criteria();
    println!(
        "match criteria: {}",
        criteria_to_json(&criteria).expect("serialize criteria")
    );

    let api = HidApi::new().expect("init hidapi");
    for info in api.device_list() {
        println!(
            "VID:PID={:04x}:{:04x} {} iface={} prod={:?} path={}",
            info.vendor_id(),
            info.product_id(),
            usage_name(info.usage_page(), info.usage()),
            info.interface_number(),
            info.product_string(),
            info.path().to_string_lossy()
        );

        let raw: Rc<dyn RawDevice> = match HidapiDevice::open(info, &api, 1) {
            Ok(dev) => {
                let layout = dev.layout();
                println!(
                    "    {} input fields, {} byte reports, pid={}",
                    layout.fields.len(),
                    layout.max_report_len(),
                    layout.force_feedback
                );
                Rc::new(dev)
            }
            Err(e) => {
                println!("    not opened: {e}");
                continue;
            }
        };
        match resolve_default(raw) {
            Ok(device) => println!("    matched: {}", device.meta()),
            Err(e) => println!("    {e}"),
        }
    }
}
