use feelhid::{Manager, ManagerConfig};
use std::time::{Duration, Instant};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Optional config path as the first argument.
    let config = match std::env::args().nth(1) {
        Some(path) => ManagerConfig::load(path).expect("load config"),
        None => ManagerConfig::default(),
    };

    let mut api = hidapi::HidApi::new().expect("init hidapi");
    let mut mgr = Manager::new(config).expect("build manager");
    mgr.refresh(&mut api).expect("enumerate devices");

    println!("Devices:");
    for d in mgr.devices() {
        println!("- {} ({})", d.meta(), d.id());
    }

    let mut last_refresh = Instant::now();
    loop {
        for ev in mgr.poll_events() {
            println!("{}: [{}] {:?}", ev.device, ev.index, ev.kind);
        }
        if last_refresh.elapsed() > Duration::from_secs(2) {
            if let Err(e) = mgr.refresh(&mut api) {
                eprintln!("refresh failed: {e}");
            }
            last_refresh = Instant::now();
        }
        // Sleep a touch to avoid pegging the CPU in the demo
        std::thread::sleep(Duration::from_millis(5));
    }
}
