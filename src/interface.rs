use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::error::ErrorKind;
use crate::traits::Command;

/// Set on the address byte to request a register read
const READ_FLAG: u8 = 0x80;

/// Byte clocked out to receive a register read response
const READ_FILLER: u8 = 0xFF;

/// Fixed opcode preceding a pixel data stream
const WRITE_RAM_OPCODE: u8 = 0x10;

/// Operand bytes a register transaction can carry at most
const MAX_OPERANDS: usize = 4;

/// Time between two busy-pin polls
const BUSY_POLL_STEP_US: u32 = 100;

/// Default budget for one busy or ready wait
const DEFAULT_BUSY_TIMEOUT_US: u32 = 5_000_000;

/// The connection interface of the UC8156
///
/// The controller has no data/command pin; the register address is simply
/// the first byte of every chip-select bracketed transaction, and every
/// transaction is followed by a busy-handshake. Transactions never overlap.
pub(crate) struct DisplayInterface<SPI, CS, BUSY, RST> {
    /// SPI
    _spi: PhantomData<SPI>,
    /// Chip select, low active
    cs: CS,
    /// Low while the controller is mid-operation
    busy: BUSY,
    /// Reset line, `None` when not wired
    rst: Option<RST>,
    /// Budget in us for one busy or charge-pump-ready wait
    busy_timeout_us: u32,
}

impl<SPI, CS, BUSY, RST> DisplayInterface<SPI, CS, BUSY, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    RST: OutputPin,
{
    /// Creates a new `DisplayInterface`
    ///
    /// If no timeout is given, a default of 5s is used.
    pub fn new(cs: CS, busy: BUSY, rst: Option<RST>, busy_timeout_us: Option<u32>) -> Self {
        let busy_timeout_us = busy_timeout_us.unwrap_or(DEFAULT_BUSY_TIMEOUT_US);
        DisplayInterface {
            _spi: PhantomData,
            cs,
            busy,
            rst,
            busy_timeout_us,
        }
    }

    /// Sets a register to up to four operand bytes
    ///
    /// Operand presence is the slice length; a shorter slice simply ends the
    /// transaction early.
    pub(crate) fn write_register<T: Command, DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        command: T,
        operands: &[u8],
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        debug_assert!(operands.len() <= MAX_OPERANDS);
        let mut frame = [0u8; 1 + MAX_OPERANDS];
        frame[0] = command.address();
        frame[1..1 + operands.len()].copy_from_slice(operands);

        self.cs.set_low().map_err(ErrorKind::CsError)?;
        spi.write(&frame[..1 + operands.len()])
            .map_err(ErrorKind::SpiError)?;
        spi.flush().map_err(ErrorKind::SpiError)?;
        self.cs.set_high().map_err(ErrorKind::CsError)?;

        self.wait_until_idle(delay)
    }

    /// Returns the value of the register at the given address
    pub(crate) fn read_register<T: Command, DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        command: T,
    ) -> Result<u8, ErrorKind<SPI, CS, BUSY, RST>> {
        let mut response = [READ_FILLER];

        self.cs.set_low().map_err(ErrorKind::CsError)?;
        spi.write(&[command.address() | READ_FLAG])
            .map_err(ErrorKind::SpiError)?;
        spi.transfer_in_place(&mut response)
            .map_err(ErrorKind::SpiError)?;
        spi.flush().map_err(ErrorKind::SpiError)?;
        self.cs.set_high().map_err(ErrorKind::CsError)?;

        self.wait_until_idle(delay)?;
        Ok(response[0])
    }

    /// Streams pixel data behind the fixed buffer-write opcode
    pub(crate) fn write_ram<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        data: &[u8],
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.cs.set_low().map_err(ErrorKind::CsError)?;
        spi.write(&[WRITE_RAM_OPCODE]).map_err(ErrorKind::SpiError)?;
        spi.write(data).map_err(ErrorKind::SpiError)?;
        spi.flush().map_err(ErrorKind::SpiError)?;
        self.cs.set_high().map_err(ErrorKind::CsError)?;

        self.wait_until_idle(delay)
    }

    /// Waits until the controller isn't busy anymore (busy == HIGH)
    ///
    /// The poll is bounded; a device that never comes back returns
    /// [`ErrorKind::DeviceTimeout`] instead of hanging the caller.
    pub(crate) fn wait_until_idle<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        let mut remaining_us = self.busy_timeout_us;
        loop {
            if !self.busy.is_low().map_err(ErrorKind::BusyError)? {
                return Ok(());
            }
            if remaining_us == 0 {
                return Err(ErrorKind::DeviceTimeout);
            }
            let step = remaining_us.min(BUSY_POLL_STEP_US);
            delay.delay_us(step);
            remaining_us -= step;
        }
    }

    /// Budget in us shared by all ready waits
    pub(crate) fn busy_timeout_us(&self) -> u32 {
        self.busy_timeout_us
    }

    /// Hardware reset: three 5ms-spaced toggles of the reset line, then a
    /// busy gate.
    ///
    /// Returns `false` when no reset line is wired, the caller must then
    /// issue the software-reset register command instead.
    pub(crate) fn reset<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
    ) -> Result<bool, ErrorKind<SPI, CS, BUSY, RST>> {
        let rst = match self.rst.as_mut() {
            Some(rst) => rst,
            None => return Ok(false),
        };

        rst.set_high().map_err(ErrorKind::RstError)?;
        delay.delay_ms(5);
        rst.set_low().map_err(ErrorKind::RstError)?;
        delay.delay_ms(5);
        rst.set_high().map_err(ErrorKind::RstError)?;
        delay.delay_ms(5);

        self.wait_until_idle(delay)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallseg::command::Command;

    extern crate std;
    use std::vec;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[test]
    fn write_register_frames_address_and_operands() {
        let mut spi = SpiMock::new(&[
            SpiTransaction::write_vec(vec![0x1D, 0x04]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[PinTransaction::set(State::Low), PinTransaction::set(State::High)]);
        let mut busy = PinMock::new(&[PinTransaction::get(State::High)]);

        let mut interface: DisplayInterface<_, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, None);
        interface
            .write_register(&mut spi, &mut NoopDelay::new(), Command::BorderSetting, &[0x04])
            .unwrap();

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn write_register_without_operands_sends_the_address_alone() {
        let mut spi = SpiMock::new(&[
            SpiTransaction::write_vec(vec![0x20]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[PinTransaction::set(State::Low), PinTransaction::set(State::High)]);
        let mut busy = PinMock::new(&[PinTransaction::get(State::High)]);

        let mut interface: DisplayInterface<_, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, None);
        interface
            .write_register(&mut spi, &mut NoopDelay::new(), Command::SoftwareReset, &[])
            .unwrap();

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn read_register_sets_the_read_flag_and_clocks_a_filler() {
        let mut spi = SpiMock::new(&[
            SpiTransaction::write_vec(vec![0x15 | 0x80]),
            SpiTransaction::transfer_in_place(vec![0xFF], vec![0x2A]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[PinTransaction::set(State::Low), PinTransaction::set(State::High)]);
        let mut busy = PinMock::new(&[PinTransaction::get(State::High)]);

        let mut interface: DisplayInterface<_, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, None);
        let value = interface
            .read_register(&mut spi, &mut NoopDelay::new(), Command::PumpStatus)
            .unwrap();
        assert_eq!(value, 0x2A);

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn write_ram_streams_behind_the_opcode() {
        let data = [0xAA; 4];
        let mut spi = SpiMock::new(&[
            SpiTransaction::write_vec(vec![0x10]),
            SpiTransaction::write_vec(data.to_vec()),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&[PinTransaction::set(State::Low), PinTransaction::set(State::High)]);
        let mut busy = PinMock::new(&[PinTransaction::get(State::High)]);

        let mut interface: DisplayInterface<_, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, None);
        interface
            .write_ram(&mut spi, &mut NoopDelay::new(), &data)
            .unwrap();

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn busy_wait_times_out_instead_of_spinning() {
        let mut spi = SpiMock::<u8>::new(&[]);
        let mut cs = PinMock::new(&[]);
        // 300us budget, polled in 100us steps: four looks at the pin
        let mut busy = PinMock::new(&[
            PinTransaction::get(State::Low),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::Low),
            PinTransaction::get(State::Low),
        ]);

        let mut interface: DisplayInterface<SpiMock<u8>, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, Some(300));
        let result = interface.wait_until_idle(&mut NoopDelay::new());
        assert!(matches!(result, Err(ErrorKind::DeviceTimeout)));

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn reset_reports_a_missing_reset_line() {
        let mut spi = SpiMock::<u8>::new(&[]);
        let mut cs = PinMock::new(&[]);
        let mut busy = PinMock::new(&[]);

        let mut interface: DisplayInterface<SpiMock<u8>, _, _, PinMock> =
            DisplayInterface::new(cs.clone(), busy.clone(), None, None);
        assert!(!interface.reset(&mut NoopDelay::new()).unwrap());

        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn reset_toggles_a_wired_line() {
        let mut spi = SpiMock::<u8>::new(&[]);
        let mut cs = PinMock::new(&[]);
        let mut busy = PinMock::new(&[PinTransaction::get(State::High)]);
        let mut rst = PinMock::new(&[
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]);

        let mut interface: DisplayInterface<SpiMock<u8>, _, _, _> =
            DisplayInterface::new(cs.clone(), busy.clone(), Some(rst.clone()), None);
        assert!(interface.reset(&mut NoopDelay::new()).unwrap());

        spi.done();
        cs.done();
        busy.done();
        rst.done();
    }
}
