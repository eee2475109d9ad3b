//! Drive Parameter Access
//!
//! Typed reads and writes of drive registers, addressed by (index, offset), on top of
//! a protocol [`Session`].
//!
//! Register values travel in host byte order; the drives use the same little-endian
//! layout as the hosts they are normally paired with.

mod product;
mod status;

pub use product::{c_string, ProductInfo, PRODUCT_INFO_SIZE};
pub use status::{
    BridgeControl, BridgeStatus, DriveStatus1, DriveStatus2, ProtectionStatus, StatusReport,
    SystemProtection,
};

use crate::protocol::{CommandParams, ProtocolError, Session, Transport};

/// Location of a drive register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Parameter group
    pub index: u8,
    /// Parameter within the group
    pub offset: u8,
}

impl Register {
    const fn new(index: u8, offset: u8) -> Self {
        Self { index, offset }
    }
}

/// Well-known registers
pub mod registers {
    use super::Register;

    /// Bridge control word
    pub const BRIDGE_CONTROL: Register = Register::new(0x01, 0x00);
    /// Bridge status word
    pub const BRIDGE_STATUS: Register = Register::new(0x02, 0x00);
    /// Drive protection status word
    pub const PROTECTION_STATUS: Register = Register::new(0x02, 0x01);
    /// System protection status word
    pub const SYSTEM_PROTECTION: Register = Register::new(0x02, 0x02);
    /// Drive system status 1
    pub const DRIVE_STATUS_1: Register = Register::new(0x02, 0x03);
    /// Drive system status 2
    pub const DRIVE_STATUS_2: Register = Register::new(0x02, 0x04);
    /// Access control word
    pub const ACCESS_CONTROL: Register = Register::new(0x07, 0x00);
    /// Drive name string
    pub const DRIVE_NAME: Register = Register::new(0x0B, 0x00);
    /// Interface (command parameter) values, offsets 0-15
    pub const COMMAND_PARAMS: Register = Register::new(0x45, 0x00);
    /// Product information block
    pub const PRODUCT_INFO: Register = Register::new(0x8C, 0x00);
}

/// Access mask granting write access to every register
pub const FULL_ACCESS: u16 = 0x000E;

/// Highest command parameter number
pub const MAX_COMMAND_PARAM: u8 = 15;

/// Maximum drive name length read back
const DRIVE_NAME_LEN: usize = 256;

/// Parameter-level interface to a single drive
pub struct Drive<T: Transport> {
    session: Session<T>,
}

impl<T: Transport> Drive<T> {
    /// Wrap an open session
    pub fn new(session: Session<T>) -> Self {
        Self { session }
    }

    /// Underlying session
    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Underlying session, mutably
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// Release the session
    pub fn into_session(self) -> Session<T> {
        self.session
    }

    /// Read up to `buf.len()` bytes from (index, offset), returning the count delivered
    pub fn get_string(
        &mut self,
        index: u8,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<usize, ProtocolError> {
        let params = CommandParams::read(index, offset, buf.len());
        let reply = self.session.exchange(&params, buf).map_err(|e| {
            tracing::debug!(index, offset, "Could not read back data: {}", e);
            e
        })?;
        Ok(reply.payload_len())
    }

    /// Read a 16-bit register
    pub fn get_u16(&mut self, index: u8, offset: u8) -> Result<u16, ProtocolError> {
        let mut buf = [0u8; 2];
        self.get_exact(index, offset, &mut buf)?;
        Ok(u16::from_ne_bytes(buf))
    }

    /// Read a 32-bit register
    pub fn get_u32(&mut self, index: u8, offset: u8) -> Result<u32, ProtocolError> {
        let mut buf = [0u8; 4];
        self.get_exact(index, offset, &mut buf)?;
        Ok(u32::from_ne_bytes(buf))
    }

    /// Fixed-size read; a shorter reply is an error rather than a zero-padded value
    fn get_exact(&mut self, index: u8, offset: u8, buf: &mut [u8]) -> Result<(), ProtocolError> {
        let len = self.get_string(index, offset, buf)?;
        if len != buf.len() {
            tracing::debug!(index, offset, len, "Register reply has wrong length");
            return Err(ProtocolError::UnexpectedLength {
                expected: buf.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Write `data` to (index, offset)
    pub fn write_string(
        &mut self,
        index: u8,
        offset: u8,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        let params = CommandParams::write(index, offset, data);
        self.session.exchange(&params, &mut []).map_err(|e| {
            tracing::debug!(index, offset, "Could not write parameter: {}", e);
            e
        })?;
        Ok(())
    }

    /// Write a 16-bit register
    pub fn write_u16(&mut self, index: u8, offset: u8, value: u16) -> Result<(), ProtocolError> {
        self.write_string(index, offset, &value.to_ne_bytes())
    }

    /// Write a 32-bit register
    pub fn write_u32(&mut self, index: u8, offset: u8, value: u32) -> Result<(), ProtocolError> {
        self.write_string(index, offset, &value.to_ne_bytes())
    }

    fn read_register(&mut self, reg: Register) -> Result<u16, ProtocolError> {
        self.get_u16(reg.index, reg.offset)
    }

    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), ProtocolError> {
        self.write_u16(reg.index, reg.offset, value)
    }

    /// Gain write access to all registers
    pub fn get_access_control(&mut self) -> Result<(), ProtocolError> {
        self.write_register(registers::ACCESS_CONTROL, FULL_ACCESS)
    }

    /// Read the product information block
    pub fn get_product_info(&mut self) -> Result<ProductInfo, ProtocolError> {
        let mut raw = [0u8; PRODUCT_INFO_SIZE];
        let reg = registers::PRODUCT_INFO;
        self.get_string(reg.index, reg.offset, &mut raw)?;
        Ok(ProductInfo::from_bytes(&raw))
    }

    /// Read interface value `param` (0-15)
    pub fn get_command_param(&mut self, param: u8) -> Result<u32, ProtocolError> {
        let reg = command_param_register(param)?;
        self.get_u32(reg.index, reg.offset)
    }

    /// Write interface value `param` (0-15)
    pub fn set_command_param(&mut self, param: u8, value: u32) -> Result<(), ProtocolError> {
        let reg = command_param_register(param)?;
        self.write_u32(reg.index, reg.offset, value)
    }

    /// Drive name string
    pub fn drive_name(&mut self) -> Result<String, ProtocolError> {
        let mut buf = [0u8; DRIVE_NAME_LEN];
        let reg = registers::DRIVE_NAME;
        let len = self.get_string(reg.index, reg.offset, &mut buf)?;
        Ok(c_string(&buf[..len]))
    }

    /// Read the bridge control word
    pub fn bridge_control(&mut self) -> Result<BridgeControl, ProtocolError> {
        self.read_register(registers::BRIDGE_CONTROL)
            .map(BridgeControl::from_bits)
    }

    /// Write the bridge control word
    pub fn set_bridge_control(&mut self, control: BridgeControl) -> Result<(), ProtocolError> {
        self.write_register(registers::BRIDGE_CONTROL, control.bits())
    }

    /// Enable (clear inhibit) or disable (set inhibit) the power bridge
    pub fn enable_bridge(&mut self, enable: bool) -> Result<(), ProtocolError> {
        self.update_bridge_control(|control| control.set(BridgeControl::INHIBIT, !enable))
    }

    /// Engage or release quick stop
    pub fn quick_stop(&mut self, active: bool) -> Result<(), ProtocolError> {
        self.update_bridge_control(|control| control.set(BridgeControl::QUICK_STOP, active))
    }

    /// Pulse the reset-events bit to clear latched events
    pub fn reset_events(&mut self) -> Result<(), ProtocolError> {
        let mut control = self.bridge_control()?;
        control.set(BridgeControl::RESET_EVENTS, true);
        self.set_bridge_control(control)?;
        control.set(BridgeControl::RESET_EVENTS, false);
        self.set_bridge_control(control)
    }

    fn update_bridge_control(
        &mut self,
        update: impl FnOnce(&mut BridgeControl),
    ) -> Result<(), ProtocolError> {
        let mut control = self.bridge_control()?;
        update(&mut control);
        self.set_bridge_control(control)
    }

    /// Read the bridge status word
    pub fn bridge_status(&mut self) -> Result<BridgeStatus, ProtocolError> {
        self.read_register(registers::BRIDGE_STATUS)
            .map(BridgeStatus::from_bits)
    }

    /// Read the drive protection status word
    pub fn protection_status(&mut self) -> Result<ProtectionStatus, ProtocolError> {
        self.read_register(registers::PROTECTION_STATUS)
            .map(ProtectionStatus::from_bits)
    }

    /// Read the system protection status word
    pub fn system_protection(&mut self) -> Result<SystemProtection, ProtocolError> {
        self.read_register(registers::SYSTEM_PROTECTION)
            .map(SystemProtection::from_bits)
    }

    /// Read drive system status 1
    pub fn drive_status_1(&mut self) -> Result<DriveStatus1, ProtocolError> {
        self.read_register(registers::DRIVE_STATUS_1)
            .map(DriveStatus1::from_bits)
    }

    /// Read drive system status 2
    pub fn drive_status_2(&mut self) -> Result<DriveStatus2, ProtocolError> {
        self.read_register(registers::DRIVE_STATUS_2)
            .map(DriveStatus2::from_bits)
    }

    /// Read bridge control and every status register, stopping at the first failure
    pub fn status_report(&mut self) -> Result<StatusReport, ProtocolError> {
        Ok(StatusReport {
            bridge_control: self.bridge_control()?,
            bridge_status: self.bridge_status()?,
            protection: self.protection_status()?,
            system_protection: self.system_protection()?,
            drive_status_1: self.drive_status_1()?,
            drive_status_2: self.drive_status_2()?,
        })
    }
}

fn command_param_register(param: u8) -> Result<Register, ProtocolError> {
    if param > MAX_COMMAND_PARAM {
        return Err(ProtocolError::InvalidParameter(param));
    }
    Ok(Register::new(registers::COMMAND_PARAMS.index, param))
}
