//! Register addresses and operand encodings of the UC8156
//!
//! For more infos about the addresses and what they are doing look into the
//! UC8156 datasheet from UltraChip.

use crate::traits;

extern crate bit_field;
use bit_field::BitField;

/// Fixed first operand of every driver-voltage write
pub(crate) const DRIVER_VOLTAGE_PREFIX: u8 = 0x25;

#[allow(dead_code)]
#[derive(Copy, Clone)]
pub(crate) enum Command {
    /// Controller revision, read only
    Revision = 0x00,
    PanelSetting = 0x01,
    /// Source driving voltage, prefixed by [`DRIVER_VOLTAGE_PREFIX`]
    DriverVoltage = 0x02,
    /// Rails up (0x51) / rails down stage 1 (0x10) and stage 2 (0xC0)
    PowerControl = 0x03,
    BoostSetting = 0x04,
    IntervalSync = 0x05,
    TcomTiming = 0x06,
    InternalTemperature = 0x07,
    SetResolution = 0x0C,
    WritePixelRect = 0x0D,
    PixelAccessPos = 0x0E,
    /// Selects the RAM write pointer, see [`RamTarget`]
    DataEntryMode = 0x0F,
    /// Update trigger: 0x03 full/partial, 0x07 mono
    DisplayEngine = 0x14,
    /// Non-zero once the internal charge pump is ready, read only
    PumpStatus = 0x15,
    VcomConfig = 0x18,
    /// Common voltage (TPCOM) in 30mV steps, bit 2 of the high byte is the
    /// sign flag
    TpcomConfig = 0x1B,
    BorderSetting = 0x1D,
    PowerSequence = 0x1F,
    SoftwareReset = 0x20,
    ProgramMtp = 0x40,
    MtpAddressSetting = 0x41,
    LoadMonoWaveform = 0x44,
}

impl traits::Command for Command {
    /// Returns the address of the command
    fn address(self) -> u8 {
        self as u8
    }
}

/// RAM write pointer selected via [`Command::DataEntryMode`]
#[derive(Copy, Clone)]
pub(crate) enum RamTarget {
    /// The live image buffer
    Current = 0x20,
    /// The "before" image used for differential update passes
    Previous = 0x30,
}

/// Encodes a common-voltage offset in mV into the two TPCOM operand bytes.
///
/// Little-endian halves of `|mv| / 30`; a negative offset sets bit 2 of the
/// high byte. `None` outside the documented -15000..=15000 range.
pub(crate) fn tpcom_operands(millivolts: i32) -> Option<[u8; 2]> {
    if !(-15_000..=15_000).contains(&millivolts) {
        return None;
    }
    let steps = millivolts.unsigned_abs() / 30;
    let mut high = (steps >> 8) as u8;
    high.set_bit(2, millivolts < 0);
    Some([steps as u8, high])
}

/// Encodes a source-voltage magnitude in mV into the driver-voltage operand.
///
/// The volt count is offset by -8 and scaled by 2, then packed into both
/// nibbles. `None` outside the documented 8000..=15000 range.
pub(crate) fn source_voltage_operand(millivolts: i32) -> Option<u8> {
    if !(8_000..=15_000).contains(&millivolts) {
        return None;
    }
    let step = ((millivolts / 1_000 - 8) * 2) as u8;
    Some(*0u8.set_bits(4..8, step).set_bits(0..4, step))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tpcom_zero_is_two_zero_bytes() {
        assert_eq!(tpcom_operands(0), Some([0x00, 0x00]));
    }

    #[test]
    fn tpcom_positive_is_little_endian_steps() {
        // +15000mV -> 500 steps
        assert_eq!(tpcom_operands(15_000), Some([0xF4, 0x01]));
        // +10000mV -> 333 steps
        assert_eq!(tpcom_operands(10_000), Some([0x4D, 0x01]));
    }

    #[test]
    fn tpcom_negative_sets_the_sign_flag() {
        assert_eq!(tpcom_operands(-15_000), Some([0xF4, 0x01 | 0x04]));
        assert_eq!(tpcom_operands(-10_000), Some([0x4D, 0x01 | 0x04]));
    }

    #[test]
    fn tpcom_rejects_out_of_range_offsets() {
        assert_eq!(tpcom_operands(15_030), None);
        assert_eq!(tpcom_operands(-15_030), None);
    }

    #[test]
    fn source_voltage_packs_both_nibbles() {
        assert_eq!(source_voltage_operand(15_000), Some(0xEE));
        assert_eq!(source_voltage_operand(13_000), Some(0xAA));
        assert_eq!(source_voltage_operand(10_000), Some(0x44));
        assert_eq!(source_voltage_operand(8_000), Some(0x00));
    }

    #[test]
    fn source_voltage_rejects_out_of_range_magnitudes() {
        assert_eq!(source_voltage_operand(7_000), None);
        assert_eq!(source_voltage_operand(16_000), None);
        assert_eq!(source_voltage_operand(-13_000), None);
    }
}
