use std::env;
use std::thread;
use std::time::{Duration, Instant};

use telemetry_serial::frame::codec::RawBytesCodec;
use telemetry_serial::session::serial::{SerialConfig, SerialConnector};
use telemetry_serial::session::{Link, LinkConfig, LinkEvent};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // first USB serial port unless a path is given
    let config = match env::args().nth(1) {
        Some(path) => SerialConfig::with_path(&path),
        None => SerialConfig::default(),
    };

    let connector = SerialConnector::new(config);
    let mut link = Link::<_, RawBytesCodec>::new(connector, LinkConfig::default());
    let dashboard = link.handle();
    link.start(Instant::now());

    loop {
        match link.poll(Instant::now()) {
            LinkEvent::Decoded(_) => {
                if let Some(state) = dashboard.snapshot() {
                    println!("{}\n", state);
                }
            }
            LinkEvent::Connected => println!("connected"),
            LinkEvent::Lost(e) => eprintln!("connection lost: {}", e),
            LinkEvent::ConnectFailed(_) | LinkEvent::Idle => {
                thread::sleep(Duration::from_millis(50))
            }
            LinkEvent::Closed => break,
        }
    }
}
