//! One-shot device commands: wipe, wink and bootloader control

use u2fzero_core::custom;
use u2fzero_core::Transport;

use super::CmdResult;

/// Erase all keys; the user has to confirm on the token
pub fn run_wipe<T: Transport + ?Sized>(token: &mut T) -> CmdResult {
    println!("Press U2F button repeatedly until the LED is no longer red.");

    if custom::wipe(token)? {
        println!("Wipe succeeded");
        Ok(())
    } else {
        Err("Wipe failed".into())
    }
}

/// Blink the LED
pub fn run_wink<T: Transport + ?Sized>(token: &mut T) -> CmdResult {
    custom::wink(token)?;
    println!("Winked");
    Ok(())
}

/// Switch to bootloader mode
pub fn run_bootloader<T: Transport + ?Sized>(token: &mut T) -> CmdResult {
    custom::enter_bootloader(token)?;
    println!("Bootloader request sent. The token re-enumerates in bootloader mode if enabled.");
    Ok(())
}

/// Permanently disable the bootloader
pub fn run_bootloader_destroy<T: Transport + ?Sized>(token: &mut T) -> CmdResult {
    custom::destroy_bootloader(token)?;
    println!("Bootloader destroy request sent. Firmware updates are no longer possible.");
    Ok(())
}
