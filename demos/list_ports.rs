//! Enumerate system serial ports.
//!
//! An empty list just means no device is plugged in.

fn main() {
    env_logger::init();

    let ports = sandtable_motion::device::available_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }

    println!("Available serial ports:");
    for port in ports {
        println!("  {}", port);
    }
}
