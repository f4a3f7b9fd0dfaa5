//! Audio output device listing.

use tapdelay_io::list_output_devices;

pub fn run() -> anyhow::Result<()> {
    let devices = list_output_devices()?;

    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Output Devices:");
    for device in &devices {
        let default = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} Hz){}",
            device.index, device.name, device.default_sample_rate, default
        );
    }
    println!();
    println!("Tip: pass an index, a partial name, or \"default\" to play:");
    println!("  tapdelay play 0 input.wav");
    println!("  tapdelay play \"USB\" input.wav");

    Ok(())
}
