//! Prints the hex chunks a controller would send for a random snapshot, one per line.
//! The output can be fed back to `telemetry-decode`.
use rand::{thread_rng, Rng};

use telemetry_serial::frame::{codec::HexTextCodec, encode_field, Error};
use telemetry_serial::telemetry::{ChargeStatus, Tag};
use telemetry_serial::TelemetryState;

fn main() {
    let mut rng = thread_rng();
    let mut snapshot = TelemetryState::new();
    snapshot.speed = rng.gen_range(0, 120);
    snapshot.temperature = rng.gen_range(15, 60);
    snapshot.sum_voltage = rng.gen_range(60, 84);
    snapshot.state_of_charge = rng.gen_range(0, 101);
    snapshot.distance_covered = rng.gen_range(0, 5_000);
    snapshot.distance_covered_previous = rng.gen_range(0, 5_000);
    snapshot.range = rng.gen_range(0, 300);
    for code in snapshot.fault_codes.iter_mut() {
        *code = rng.gen_range(0, 0x0f);
    }
    snapshot.charge_status = ChargeStatus(rng.gen_range(0, 2));

    for tag in Tag::ALL.iter() {
        match encode_field::<HexTextCodec>(*tag, &snapshot) {
            Ok(chunk) => println!("{}", String::from_utf8_lossy(&chunk)),
            Err(Error::AmbiguousEncoding) => {
                eprintln!("{:?} collides with the delimiter, skipped", tag)
            }
            Err(e) => eprintln!("{:?} could not be encoded: {}", tag, e),
        }
    }
}
