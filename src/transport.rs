use std::{
    io,
    time::{Duration, Instant},
};

use serial2::{SerialPort, Settings};
use tracing::{debug, trace};

use crate::{
    dialect::SerialSettings,
    error::{PrinterError, Result},
};

/// granularity of the deadline loop while waiting for data
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// byte channel to a printer
pub trait Transport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// read whatever is available into `buffer`, waiting at most `timeout` for the first byte
    ///
    /// returns 0 when nothing arrived before the deadline
    fn read(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// drop everything received but not read yet
    fn discard_input(&mut self) -> io::Result<()>;

    /// release the channel, further use fails
    fn close(&mut self);
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port already closed")
}

/// a printer attached to a serial port
pub struct SerialTransport {
    /// serial or USB port to communicate over, `None` once released
    port: Option<SerialPort>,
    port_name: String,
}

impl SerialTransport {
    /// open the serial port with the line settings of a printer model
    ///
    /// # Arguments
    ///
    /// * `port_name` - the device name of the serial port to open, e.g. `/dev/ttyUSB0` or `COM1`
    /// * `settings` - baud rate, framing and flow control, see [`crate::dialect::DialectDescriptor`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fiscal_printer::{dialect::Dialect, transport::SerialTransport};
    ///
    /// let descriptor = Dialect::PosnetThermal301.descriptor();
    /// let transport = SerialTransport::open("/dev/ttyUSB0", &descriptor.serial)?;
    /// # Ok::<(), fiscal_printer::error::PrinterError>(())
    /// ```
    pub fn open(port_name: &str, settings: &SerialSettings) -> Result<Self> {
        let serial = *settings;
        let mut port = SerialPort::open(port_name, |mut settings: Settings| {
            settings.set_raw();
            settings.set_baud_rate(serial.baud_rate)?;
            settings.set_char_size(serial.char_size);
            settings.set_stop_bits(serial.stop_bits);
            settings.set_parity(serial.parity);
            settings.set_flow_control(serial.flow_control);
            Ok(settings)
        })
        .map_err(|err| PrinterError::Transport(format!("cannot open {}: {}", port_name, err)))?;
        port.discard_buffers()?;
        port.set_read_timeout(POLL_INTERVAL)?;
        debug!("opened {} at {} baud", port_name, serial.baud_rate);
        Ok(SerialTransport {
            port: Some(port),
            port_name: String::from(port_name),
        })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port.as_mut().ok_or_else(closed)?;
        debug!("WRITE TO SERIAL {} bytes: {:02X?}", data.len(), data);
        port.write_all(data)
    }

    fn read(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let port = self.port.as_mut().ok_or_else(closed)?;
        let start_ts = Instant::now();
        loop {
            match port.read(buffer) {
                Ok(0) => {}
                Ok(read_bytes) => {
                    debug!(
                        "READ FROM SERIAL {} bytes: {:02X?}",
                        read_bytes,
                        &buffer[..read_bytes]
                    );
                    return Ok(read_bytes);
                }
                // no data from the serial interface yet
                Err(err) if err.kind() == io::ErrorKind::TimedOut => {}
                Err(err) => return Err(err),
            }
            if start_ts.elapsed() >= timeout {
                trace!("nothing received within {:?}", timeout);
                return Ok(0);
            }
        }
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let port = self.port.as_mut().ok_or_else(closed)?;
        port.discard_input_buffer()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closed {}", self.port_name);
        }
    }
}
