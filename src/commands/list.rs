//! List command implementation

use super::CmdResult;

/// List all connected U2F Zero tokens
pub fn run() -> CmdResult {
    let devices = u2fzero_hid::list_devices()?;

    if devices.is_empty() {
        println!("No U2F Zero tokens found (VID:10c4 PID:8acf)");
        return Ok(());
    }

    for (i, dev) in devices.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{:<16}: {}", "path", dev.path);
        println!("{:<16}: {:04x}:{:04x}", "id", dev.vendor_id, dev.product_id);
        println!("{:<16}: {}", "serial", dev.serial_number.as_deref().unwrap_or("-"));
        println!("{:<16}: {}", "manufacturer", dev.manufacturer.as_deref().unwrap_or("-"));
        println!("{:<16}: {}", "product", dev.product.as_deref().unwrap_or("-"));
        println!(
            "{:<16}: {:x}.{:02x}",
            "release",
            dev.release_number >> 8,
            dev.release_number & 0xff
        );
        println!("{:<16}: {}", "interface", dev.interface_number);
        println!("{:<16}: 0x{:04x} / 0x{:04x}", "usage", dev.usage_page, dev.usage);
    }

    Ok(())
}
