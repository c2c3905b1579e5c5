//! Control-board serial link on the ESP-IDF UART driver.
//!
//! Implements [`Transport`] and [`Clock`] together so the control loop
//! gets a single hardware handle.  Reads are bounded by the tick
//! deadline: the remaining time is converted to FreeRTOS ticks on every
//! call.

use anyhow::Context;
use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::uart::{self, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use super::time::MonotonicClock;
use crate::app::ports::{Clock, Transport};
use crate::error::TransportError;

/// Control-board link speed, 8N1.
pub const CONTROL_BOARD_BAUD: u32 = 9600;

pub struct UartTransport<'d> {
    driver: UartDriver<'d>,
    clock: MonotonicClock,
}

impl<'d> UartTransport<'d> {
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx: impl Peripheral<P = impl OutputPin> + 'd,
        rx: impl Peripheral<P = impl InputPin> + 'd,
        baud: u32,
    ) -> anyhow::Result<Self> {
        let config = uart::config::Config::new().baudrate(Hertz(baud));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )
        .context("control-board UART init")?;
        info!("UartTransport: {} baud", baud);
        Ok(Self {
            driver,
            clock: MonotonicClock::new(),
        })
    }
}

impl Transport for UartTransport<'_> {
    fn clear_input(&mut self) {
        if let Err(e) = self.driver.clear_rx() {
            warn!("UART: clear_rx failed: {}", e);
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut sent = 0;
        while sent < bytes.len() {
            match self.driver.write(&bytes[sent..]) {
                Ok(0) | Err(_) => return Err(TransportError::Io),
                Ok(n) => sent += n,
            }
        }
        Ok(())
    }

    fn read_exact_until(
        &mut self,
        buf: &mut [u8],
        deadline_us: u64,
    ) -> Result<(), TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            let left = self.clock.remaining(deadline_us);
            if left.is_zero() {
                return Err(TransportError::Timeout);
            }
            let ticks = TickType::new_millis(left.as_millis().max(1) as u64).ticks();
            match self.driver.read(&mut buf[filled..], ticks) {
                Ok(n) => filled += n,
                Err(_) => return Err(TransportError::Io),
            }
        }
        Ok(())
    }
}

impl Clock for UartTransport<'_> {
    fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    fn sleep_until(&mut self, deadline_us: u64) {
        self.clock.sleep_until(deadline_us);
    }
}
