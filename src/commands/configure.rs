//! Configure command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use u2fzero_core::configure::{ConfigureRequest, ProvisionReport, Provisioner, Step};
use u2fzero_core::keys::KeyMaterial;
use u2fzero_core::Transport;

use super::CmdResult;

/// Create the progress bar tracking the provisioning steps
fn create_step_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(Step::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Run the full provisioning sequence
pub fn run<T: Transport + ?Sized>(
    token: &mut T,
    ecc_key: &Path,
    output: &Path,
    write_key: Option<KeyMaterial>,
    read_key: Option<KeyMaterial>,
) -> CmdResult {
    let pem = fs::read_to_string(ecc_key)
        .map_err(|e| format!("Failed to read {}: {}", ecc_key.display(), e))?;

    let mut request = ConfigureRequest::new(&pem, output);
    if let Some(key) = write_key {
        request = request.with_write_key(key);
    }
    if let Some(key) = read_key {
        request = request.with_read_key(key);
    }

    let pb = create_step_bar()?;
    let result = Provisioner::new().configure(token, &request, |step| {
        pb.set_position(step.number() as u64 - 1);
        pb.set_message(step.to_string());
    });

    match result {
        Ok(report) => {
            pb.set_position(Step::ALL.len() as u64);
            pb.finish_with_message("done");
            print_report(&report, output);
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            Err(e.into())
        }
    }
}

fn print_report(report: &ProvisionReport, output: &Path) {
    let serial: String = report.serial.iter().map(|b| format!("{:02x}", b)).collect();
    println!("Serial:     {}", serial);
    println!("CRC:        {:02x}{:02x}", report.crc[0], report.crc[1]);
    println!(
        "Write mask: {}{}",
        report.write_mask,
        if report.write_key_generated { " (generated)" } else { "" }
    );
    println!(
        "Read mask:  {}{}",
        report.read_mask,
        if report.read_key_generated { " (generated)" } else { "" }
    );
    println!("Keys written to {}", output.display());
    println!("Done. The token is now in bootloader mode.");
}
