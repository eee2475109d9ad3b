//! Bridge control and status registers
//!
//! Each register is a 16-bit word of independent flags.

use serde::Serialize;

macro_rules! register_bits {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$bmeta:meta])* $flag:ident, $getter:ident = $bit:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
        pub struct $name(u16);

        impl $name {
            $( $(#[$bmeta])* pub const $flag: u16 = 1 << $bit; )*

            const NAMES: &'static [(&'static str, u16)] = &[
                $( (stringify!($getter), 1 << $bit), )*
            ];

            /// Wrap a raw register value
            pub fn from_bits(bits: u16) -> Self {
                Self(bits)
            }

            /// Raw register value
            pub fn bits(self) -> u16 {
                self.0
            }

            /// Whether every bit of `mask` is set
            pub fn contains(self, mask: u16) -> bool {
                self.0 & mask == mask
            }

            /// Set or clear the bits of `mask`
            pub fn set(&mut self, mask: u16, on: bool) {
                if on {
                    self.0 |= mask;
                } else {
                    self.0 &= !mask;
                }
            }

            /// Names of the known flags that are set
            pub fn active(self) -> Vec<&'static str> {
                Self::NAMES
                    .iter()
                    .filter(|(_, mask)| self.contains(*mask))
                    .map(|(name, _)| *name)
                    .collect()
            }

            $(
                $(#[$bmeta])*
                pub fn $getter(self) -> bool {
                    self.contains(Self::$flag)
                }
            )*
        }
    };
}

register_bits! {
    /// Bridge control (index 0x01, offset 0x00)
    BridgeControl {
        /// Power bridge inhibited
        INHIBIT, inhibit = 0;
        /// Brake engaged
        BRAKE, brake = 1;
        /// Quick stop active
        QUICK_STOP, quick_stop = 6;
        /// Reset latched events
        RESET_EVENTS, reset_events = 12;
    }
}

register_bits! {
    /// Bridge status (index 0x02, offset 0x00)
    BridgeStatus {
        /// Bridge enabled
        ENABLED, enabled = 0;
        /// Dynamic brake enabled
        DYNAMIC_BRAKE, dynamic_brake = 1;
        /// Shunt regulator enabled
        SHUNT, shunt = 2;
        /// Positive stop enabled
        POSITIVE_STOP, positive_stop = 3;
        /// Negative stop enabled
        NEGATIVE_STOP, negative_stop = 4;
        /// Positive torque inhibited
        POSITIVE_TORQUE_INHIBIT, positive_torque_inhibit = 5;
        /// Negative torque inhibited
        NEGATIVE_TORQUE_INHIBIT, negative_torque_inhibit = 6;
        /// External brake active
        EXTERNAL_BRAKE, external_brake = 7;
    }
}

register_bits! {
    /// Drive protection status (index 0x02, offset 0x01)
    ProtectionStatus {
        /// Drive reset
        RESET, reset = 0;
        /// Internal error
        INTERNAL_ERROR, internal_error = 1;
        /// Short circuit
        SHORT_CIRCUIT, short_circuit = 2;
        /// Over current
        OVER_CURRENT, over_current = 3;
        /// Under voltage
        UNDER_VOLTAGE, under_voltage = 4;
        /// Over voltage
        OVER_VOLTAGE, over_voltage = 5;
        /// Drive over temperature
        OVER_TEMPERATURE, over_temperature = 6;
    }
}

register_bits! {
    /// System protection status (index 0x02, offset 0x02)
    SystemProtection {
        /// Parameter restore error
        RESTORE_ERROR, restore_error = 0;
        /// Parameter store error
        STORE_ERROR, store_error = 1;
        /// Motor over temperature
        MOTOR_OVER_TEMPERATURE, motor_over_temperature = 4;
        /// Feedback error
        FEEDBACK_ERROR, feedback_error = 6;
        /// Over speed
        OVER_SPEED, over_speed = 7;
        /// Communications error
        COMMS_ERROR, comms_error = 10;
    }
}

register_bits! {
    /// Drive system status 1 (index 0x02, offset 0x03)
    DriveStatus1 {
        /// Log entry missed
        LOG_MISSED, log_missed = 0;
        /// Commanded inhibit
        COMMANDED_INHIBIT, commanded_inhibit = 1;
        /// User inhibit
        USER_INHIBIT, user_inhibit = 2;
        /// Positive direction inhibited
        POSITIVE_INHIBIT, positive_inhibit = 3;
        /// Negative direction inhibited
        NEGATIVE_INHIBIT, negative_inhibit = 4;
        /// Current limiting
        CURRENT_LIMIT, current_limit = 5;
        /// Continuous current limiting
        CONTINUOUS_CURRENT_LIMIT, continuous_current_limit = 6;
        /// Current loop saturated
        CURRENT_LOOP_SATURATED, current_loop_saturated = 7;
        /// Commanded dynamic brake
        COMMANDED_DYNAMIC_BRAKE, commanded_dynamic_brake = 12;
        /// User dynamic brake
        USER_DYNAMIC_BRAKE, user_dynamic_brake = 13;
        /// Shunt regulator active
        SHUNT_REGULATOR, shunt_regulator = 14;
    }
}

register_bits! {
    /// Drive system status 2 (index 0x02, offset 0x04)
    DriveStatus2 {
        /// Zero velocity
        ZERO_VELOCITY, zero_velocity = 0;
        /// At command
        AT_COMMAND, at_command = 1;
        /// Velocity following error
        VELOCITY_FOLLOWING_ERROR, velocity_following_error = 2;
        /// Positive velocity limit
        POSITIVE_VELOCITY_LIMIT, positive_velocity_limit = 3;
        /// Negative velocity limit
        NEGATIVE_VELOCITY_LIMIT, negative_velocity_limit = 4;
        /// Command profiler active
        COMMAND_PROFILER, command_profiler = 5;
    }
}

/// Snapshot of the bridge control word and all status registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Bridge control
    pub bridge_control: BridgeControl,
    /// Bridge status
    pub bridge_status: BridgeStatus,
    /// Drive protection status
    pub protection: ProtectionStatus,
    /// System protection status
    pub system_protection: SystemProtection,
    /// Drive system status 1
    pub drive_status_1: DriveStatus1,
    /// Drive system status 2
    pub drive_status_2: DriveStatus2,
}
