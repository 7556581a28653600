//! A driver for the small segmented E-Paper displays from Plastic Logic via SPI
//!
//! The panels are built on the UC8156 controller IC. The glass shows four
//! gray levels directly; the other colors are rendered by repeating update
//! passes under specific common- and source-voltage settings.
//!
//! # References
//!
//! - [Plastic Logic hook-up guides](https://github.com/plasticlogic)
//! - UC8156 datasheet from UltraChip

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use crate::buffer::{Frame, FRAME_BYTES, SEGMENT_COUNT};
use crate::color::{Color, Gray};
use crate::error::ErrorKind;
use crate::interface::DisplayInterface;

pub(crate) mod command;
use self::command::{
    source_voltage_operand, tpcom_operands, Command, RamTarget, DRIVER_VOLTAGE_PREFIX,
};

pub use crate::buffer::{BUFFER_SIZE, ROWS, WIDTH};

/// Time between two charge-pump-ready polls
const PUMP_POLL_STEP_US: u32 = 100;

/// Waveform selected when triggering an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Full update, 4 gray levels, ~800ms
    #[default]
    Full,
    /// Partial update, 4 gray levels, ~800ms
    Partial,
    /// Partial mono update, 2 gray levels, ~250ms
    Mono,
}

impl UpdateMode {
    /// Operands for the program-select and engine-trigger registers
    fn operands(self) -> (u8, u8) {
        match self {
            UpdateMode::Full | UpdateMode::Partial => (0x00, 0x03),
            UpdateMode::Mono => (0x02, 0x07),
        }
    }
}

/// Who sequences the voltage rails around an update trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerMode {
    /// The trigger is wrapped in [`power_on`](SmallSeg::power_on) and
    /// [`power_off`](SmallSeg::power_off)
    #[default]
    Auto,
    /// The caller sequences power itself, e.g. to batch several triggers
    /// under one power-up
    Manual,
}

/// State of the panel voltage rails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    /// Rails down
    #[default]
    Down,
    /// Rails-up command issued, charge pump not ready yet
    PoweringUp,
    /// Rails up, updates may be triggered
    Up,
    /// Rails-down sequence in progress
    PoweringDown,
}

/// Driver for the Plastic Logic small segmented EPDs
///
/// Owns the packed pixel buffer and the connection interface exclusively;
/// every operation blocks until the controller's busy handshake clears.
/// Callers on multiple threads must serialize access externally.
pub struct SmallSeg<SPI, CS, BUSY, RST> {
    /// Connection Interface
    interface: DisplayInterface<SPI, CS, BUSY, RST>,
    /// Packed pixel buffer
    frame: Frame,
    /// Rail state, tracked across power sequencing
    power: PowerState,
    /// Set by [`begin`](SmallSeg::begin)
    configured: bool,
}

impl<SPI, CS, BUSY, RST> SmallSeg<SPI, CS, BUSY, RST>
where
    SPI: SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    RST: OutputPin,
{
    /// Creates a new driver from a CS pin, a Busy pin and an optional
    /// reset pin
    ///
    /// `busy_timeout_us` bounds every busy and charge-pump-ready wait;
    /// `None` uses a default of 5s. The device is not touched until
    /// [`begin`](SmallSeg::begin) is called.
    pub fn new(cs: CS, busy: BUSY, rst: Option<RST>, busy_timeout_us: Option<u32>) -> Self {
        SmallSeg {
            interface: DisplayInterface::new(cs, busy, rst, busy_timeout_us),
            frame: Frame::new(),
            power: PowerState::Down,
            configured: false,
        }
    }

    /// Resets the UC8156 and configures all sorts of behind-the-scenes
    /// settings
    ///
    /// Performs a hardware reset if a reset line is wired, a software reset
    /// otherwise, programs the device-calibrated setup registers and ends
    /// with a [`clear_screen`](SmallSeg::clear_screen) erase.
    pub fn begin<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        if !self.interface.reset(delay)? {
            self.interface
                .write_register(spi, delay, Command::SoftwareReset, &[])?;
        }

        self.interface
            .write_register(spi, delay, Command::PanelSetting, &[0x10])?;
        self.interface
            .write_register(spi, delay, Command::WritePixelRect, &[0, 239, 0, 4])?;
        self.interface
            .write_register(spi, delay, Command::VcomConfig, &[0x00, 0x00, 0x24, 0x00])?;
        self.interface
            .write_register(spi, delay, Command::IntervalSync, &[0x00, 0x00])?;
        self.interface.write_register(
            spi,
            delay,
            Command::DriverVoltage,
            &[DRIVER_VOLTAGE_PREFIX, 0xFF],
        )?;
        self.interface
            .write_register(spi, delay, Command::BorderSetting, &[0x04])?;
        self.interface
            .write_register(spi, delay, Command::LoadMonoWaveform, &[0x60])?;
        self.interface
            .write_register(spi, delay, Command::InternalTemperature, &[0x0A])?;
        self.interface
            .write_register(spi, delay, Command::BoostSetting, &[0x22, 0x17])?;
        self.interface
            .write_register(spi, delay, Command::TpcomConfig, &[0x00, 0x00])?;

        self.configured = true;
        self.clear_screen(spi, delay)
    }

    /// Sets every packed buffer byte to the given level
    ///
    /// Only touches the local buffer, nothing is sent until the next update.
    pub fn clear(&mut self, level: Gray) {
        self.frame.clear(level);
    }

    /// Inverts the buffer content from black to white and vice versa
    pub fn invert(&mut self) {
        self.frame.invert();
    }

    /// Draws one segment at the given level into the buffer
    pub fn set_segment(&mut self, index: usize, level: Gray) {
        self.frame.set_segment(index, level);
    }

    /// Draws every segment whose bit (0..=21) is set in the mask
    pub fn draw_segments(&mut self, segments: u32, level: Gray) {
        self.frame.draw_segments(segments, level);
    }

    /// The packed pixel buffer
    pub fn buffer(&self) -> &[u8] {
        self.frame.data()
    }

    /// Current state of the panel voltage rails
    pub fn power_state(&self) -> PowerState {
        self.power
    }

    /// Number of independently drawable segments
    pub fn segment_count(&self) -> usize {
        SEGMENT_COUNT
    }

    /// Controller revision byte
    pub fn revision<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<u8, ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        self.interface.read_register(spi, delay, Command::Revision)
    }

    /// Triggers two white erase cycles to set back previous ghosting
    ///
    /// Recommended after each power cycling; also run by
    /// [`begin`](SmallSeg::begin). Leaves the buffer white and the common
    /// voltage at 0.
    pub fn clear_screen<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        for _ in 0..2 {
            self.set_tpcom(spi, delay, 15_000)?;
            self.frame.clear(Gray::Black);
            for _ in 0..3 {
                self.write_previous(spi, delay, Gray::LightGray)?;
                self.update(spi, delay, UpdateMode::Full, PowerMode::Auto)?;
            }
            delay.delay_ms(1);

            self.set_tpcom(spi, delay, -15_000)?;
            self.frame.clear(Gray::White);
            for _ in 0..3 {
                self.write_previous(spi, delay, Gray::LightGray)?;
                self.update(spi, delay, UpdateMode::Full, PowerMode::Auto)?;
            }
            delay.delay_ms(1);
        }
        self.frame.clear(Gray::White);
        self.set_tpcom(spi, delay, 0)
    }

    /// Triggers an image update based on the buffer content
    ///
    /// Flushes the buffer, then issues the program-select and engine-trigger
    /// registers for the given waveform. With [`PowerMode::Auto`] the
    /// trigger is wrapped in [`power_on`](SmallSeg::power_on) and
    /// [`power_off`](SmallSeg::power_off).
    pub fn update<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        mode: UpdateMode,
        power: PowerMode,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        self.write_frame(spi, delay)?;

        if power == PowerMode::Auto {
            self.power_on(spi, delay)?;
        }

        let (program, trigger) = mode.operands();
        self.interface
            .write_register(spi, delay, Command::ProgramMtp, &[program])?;
        self.interface
            .write_register(spi, delay, Command::DisplayEngine, &[trigger])?;
        self.interface.wait_until_idle(delay)?;

        if power == PowerMode::Auto {
            self.power_off(spi, delay)?;
        }
        Ok(())
    }

    /// Renders one of the logical colors through its multi-pass waveform
    ///
    /// Black and white share one recipe, the buffer content decides which of
    /// the two shows. The recipes are device-calibrated; the blue recipe
    /// leaves the buffer inverted, as the calibration prescribes.
    pub fn render_color<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        color: Color,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        match color {
            // +13V/-13V
            Color::Black | Color::White => {
                self.set_tpcom(spi, delay, 0)?;
                self.set_source_voltage(spi, delay, 13_000)?;
                self.frame.invert();
                for _ in 0..5 {
                    for _ in 0..2 {
                        self.write_previous(spi, delay, Gray::LightGray)?;
                        self.update(spi, delay, UpdateMode::Full, PowerMode::Auto)?;
                    }
                }
                self.frame.invert();
            }
            // 0V/+30V
            Color::Yellow => {
                self.set_tpcom(spi, delay, 15_000)?;
                self.set_source_voltage(spi, delay, 15_000)?;
                for _ in 0..3 {
                    self.write_previous(spi, delay, Gray::LightGray)?;
                    self.update(spi, delay, UpdateMode::Full, PowerMode::Auto)?;
                }
            }
            Color::Green => {
                self.set_tpcom(spi, delay, 0)?;
                self.set_source_voltage(spi, delay, 13_000)?;
                for _ in 0..3 {
                    self.write_previous(spi, delay, Gray::White)?;
                    self.update(spi, delay, UpdateMode::Mono, PowerMode::Auto)?;
                }
            }
            Color::Red => {
                self.set_source_voltage(spi, delay, 10_000)?;
                self.alternating_polarity_passes(spi, delay)?;
            }
            Color::Blue => {
                self.set_source_voltage(spi, delay, 10_000)?;
                self.alternating_polarity_passes(spi, delay)?;

                self.set_source_voltage(spi, delay, 10_000)?;
                self.set_tpcom(spi, delay, -10_000)?;
                self.frame.invert();
                for _ in 0..2 {
                    self.write_previous(spi, delay, Gray::LightGray)?;
                    self.update(spi, delay, UpdateMode::Mono, PowerMode::Auto)?;
                    delay.delay_ms(1);
                }
            }
        }
        Ok(())
    }

    /// Two mono passes per polarity with the common voltage flipped between
    /// them; shared head of the red and blue recipes
    fn alternating_polarity_passes<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        for _ in 0..2 {
            self.write_previous(spi, delay, Gray::LightGray)?;
            self.set_tpcom(spi, delay, 10_000)?;
            self.update(spi, delay, UpdateMode::Mono, PowerMode::Auto)?;
            self.frame.invert();
            delay.delay_ms(10);

            self.write_previous(spi, delay, Gray::LightGray)?;
            self.set_tpcom(spi, delay, -10_000)?;
            self.update(spi, delay, UpdateMode::Mono, PowerMode::Auto)?;
            self.frame.invert();
            delay.delay_ms(10);
        }
        Ok(())
    }

    /// Fills the controller's previous buffer with a constant level
    ///
    /// The previous buffer is the "before" image of the differential update
    /// passes the color recipes are made of.
    pub fn write_previous<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        fill: Gray,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        self.interface
            .write_register(spi, delay, Command::PixelAccessPos, &[0x00, 0x00])?;
        self.interface.write_register(
            spi,
            delay,
            Command::DataEntryMode,
            &[RamTarget::Previous as u8],
        )?;
        self.interface
            .write_ram(spi, delay, &[fill.get_byte_value(); FRAME_BYTES])
    }

    /// Activates the high voltages needed to update the screen
    ///
    /// Blocks until the internal charge pump reports ready, bounded by the
    /// configured timeout. Only needed directly when batching updates under
    /// [`PowerMode::Manual`].
    pub fn power_on<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        self.power = PowerState::PoweringUp;

        self.interface.wait_until_idle(delay)?;
        self.interface
            .write_register(spi, delay, Command::SetResolution, &[0, 239, 0, 4])?;
        self.interface
            .write_register(spi, delay, Command::TcomTiming, &[0xFF, 0xFF])?;
        self.interface
            .write_register(spi, delay, Command::PowerSequence, &[0x00, 0x00, 0x00])?;
        self.interface
            .write_register(spi, delay, Command::PowerControl, &[0x51])?;

        let mut remaining_us = self.interface.busy_timeout_us();
        loop {
            if self
                .interface
                .read_register(spi, delay, Command::PumpStatus)?
                != 0
            {
                break;
            }
            if remaining_us == 0 {
                return Err(ErrorKind::DeviceTimeout);
            }
            let step = remaining_us.min(PUMP_POLL_STEP_US);
            delay.delay_us(step);
            remaining_us -= step;
        }

        self.power = PowerState::Up;
        Ok(())
    }

    /// Deactivates the high voltages again
    ///
    /// Two-stage rails-down sequence, each stage gated on the busy
    /// handshake.
    pub fn power_off<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        self.power = PowerState::PoweringDown;

        self.interface
            .write_register(spi, delay, Command::PowerControl, &[0x10])?;
        self.interface
            .write_register(spi, delay, Command::PowerControl, &[0xC0])?;

        self.power = PowerState::Down;
        Ok(())
    }

    /// Sets the common voltage (TPCOM) offset in mV
    ///
    /// Global bias affecting contrast and polarity of all pixels in a pass.
    /// Offsets outside -15000..=15000 are rejected before anything is sent.
    pub fn set_tpcom<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        millivolts: i32,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        let operands = tpcom_operands(millivolts).ok_or(ErrorKind::InvalidConfiguration)?;
        self.interface
            .write_register(spi, delay, Command::TpcomConfig, &operands)
    }

    /// Sets the source driving voltage magnitude in mV
    ///
    /// Magnitudes outside 8000..=15000 are rejected before anything is sent.
    pub fn set_source_voltage<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        millivolts: i32,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.ensure_configured()?;
        let operand =
            source_voltage_operand(millivolts).ok_or(ErrorKind::InvalidConfiguration)?;
        self.interface.write_register(
            spi,
            delay,
            Command::DriverVoltage,
            &[DRIVER_VOLTAGE_PREFIX, operand],
        )
    }

    /// Flushes the live buffer into the controller's current image RAM
    fn write_frame<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        self.interface
            .write_register(spi, delay, Command::PixelAccessPos, &[0x00, 0x00])?;
        self.interface.write_register(
            spi,
            delay,
            Command::DataEntryMode,
            &[RamTarget::Current as u8],
        )?;
        self.interface.write_ram(spi, delay, self.frame.visible())
    }

    fn ensure_configured(&self) -> Result<(), ErrorKind<SPI, CS, BUSY, RST>> {
        if self.configured {
            Ok(())
        } else {
            Err(ErrorKind::NotConfigured)
        }
    }
}
