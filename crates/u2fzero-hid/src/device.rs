//! U2F Zero HID device implementation

use std::time::Duration;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use u2fzero_core::protocol::{Response, REPORT_SIZE, U2F_ZERO_PRODUCT, U2F_ZERO_VENDOR};
use u2fzero_core::Transport;

use crate::error::{HidError, Result};

/// An open U2F Zero token
///
/// The HID handle is released on [`Transport::close`] or when the value is
/// dropped, whichever comes first.
pub struct U2fZero {
    device: Option<HidDevice>,
    serial: Option<String>,
    /// Keeps the hidapi context alive for the lifetime of the handle
    _api: HidApi,
}

impl U2fZero {
    /// Open the first token, or the one with serial number `serial`
    pub fn open(serial: Option<&str>) -> Result<Self> {
        let api = HidApi::new().map_err(|e| HidError::InitFailed(e.to_string()))?;

        let info = api
            .device_list()
            .filter(|d| is_u2f_zero(d))
            .find(|d| match serial {
                Some(sn) => d.serial_number() == Some(sn),
                None => true,
            })
            .ok_or_else(|| HidError::DeviceNotFound {
                serial: serial.map(str::to_string),
            })?;

        log::debug!(
            "Opening U2F Zero at {} (serial {})",
            info.path().to_string_lossy(),
            info.serial_number().unwrap_or("?")
        );

        let device = info
            .open_device(&api)
            .map_err(|e| HidError::OpenFailed(e.to_string()))?;
        let serial = info.serial_number().map(str::to_string);

        log::info!("Opened U2F Zero {}", serial.as_deref().unwrap_or(""));

        Ok(Self {
            device: Some(device),
            serial,
            _api: api,
        })
    }

    /// Serial number of the opened token, if the device reports one
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Whether the handle is still open
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn device(&self) -> Result<&HidDevice> {
        self.device.as_ref().ok_or(HidError::Closed)
    }

    fn write_raw(&self, packet: &[u8]) -> Result<()> {
        let written = self
            .device()?
            .write(packet)
            .map_err(|e| HidError::WriteFailed(e.to_string()))?;
        if written < packet.len() {
            return Err(HidError::Incomplete {
                written,
                expected: packet.len(),
            });
        }
        Ok(())
    }

    /// Read one report; `None` on timeout
    fn read_raw(&self, timeout: Duration) -> Result<Option<Response>> {
        let mut buf = [0u8; REPORT_SIZE];
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let n = self
            .device()?
            .read_timeout(&mut buf, timeout_ms)
            .map_err(|e| HidError::ReadFailed(e.to_string()))?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(Response::new(&buf[..n])))
        }
    }
}

impl Transport for U2fZero {
    fn write_packet(&mut self, packet: &[u8]) -> u2fzero_core::Result<()> {
        Ok(self.write_raw(packet)?)
    }

    fn read_report(&mut self, timeout: Duration) -> u2fzero_core::Result<Response> {
        self.read_raw(timeout)?.ok_or(u2fzero_core::Error::Timeout)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            log::debug!("Closed U2F Zero {}", self.serial.as_deref().unwrap_or(""));
        }
    }
}

impl Drop for U2fZero {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_u2f_zero(info: &DeviceInfo) -> bool {
    info.vendor_id() == U2F_ZERO_VENDOR && info.product_id() == U2F_ZERO_PRODUCT
}

/// Information about a connected U2F Zero token
#[derive(Debug, Clone)]
pub struct U2fZeroDeviceInfo {
    /// Platform device path
    pub path: String,
    /// USB vendor id
    pub vendor_id: u16,
    /// USB product id
    pub product_id: u16,
    /// Serial number string
    pub serial_number: Option<String>,
    /// Manufacturer string
    pub manufacturer: Option<String>,
    /// Product string
    pub product: Option<String>,
    /// Device release number (BCD)
    pub release_number: u16,
    /// HID usage page
    pub usage_page: u16,
    /// HID usage
    pub usage: u16,
    /// USB interface number
    pub interface_number: i32,
}

impl From<&DeviceInfo> for U2fZeroDeviceInfo {
    fn from(d: &DeviceInfo) -> Self {
        Self {
            path: d.path().to_string_lossy().into_owned(),
            vendor_id: d.vendor_id(),
            product_id: d.product_id(),
            serial_number: d.serial_number().map(str::to_string),
            manufacturer: d.manufacturer_string().map(str::to_string),
            product: d.product_string().map(str::to_string),
            release_number: d.release_number(),
            usage_page: d.usage_page(),
            usage: d.usage(),
            interface_number: d.interface_number(),
        }
    }
}

impl std::fmt::Display for U2fZeroDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "U2F Zero {} at {}",
            self.serial_number.as_deref().unwrap_or("(no serial)"),
            self.path
        )
    }
}

/// List all connected U2F Zero tokens
pub fn list_devices() -> Result<Vec<U2fZeroDeviceInfo>> {
    let api = HidApi::new().map_err(|e| HidError::InitFailed(e.to_string()))?;
    Ok(api
        .device_list()
        .filter(|d| is_u2f_zero(d))
        .map(U2fZeroDeviceInfo::from)
        .collect())
}
