//! Minimal Modbus/TCP client for input-register reads.
//!
//! Only function 0x04 (Read Input Registers) is implemented; that is the
//! whole surface the press PLCs expose. One TCP connection per device,
//! re-established on demand after an error.
use crate::error::BusError;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

const FN_READ_INPUT_REGISTERS: u8 = 0x04;
const MBAP_LEN: usize = 7;

/// Modbus/TCP register reader. Keeps one stream per device address and
/// reconnects lazily after any I/O failure.
pub struct TcpReader {
    streams: HashMap<String, TcpStream>,
    next_txn: u16,
}

impl TcpReader {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
            next_txn: 0,
        }
    }

    fn stream(&mut self, address: &str, timeout: Duration) -> Result<&mut TcpStream, BusError> {
        if !self.streams.contains_key(address) {
            let addr = address
                .parse::<std::net::SocketAddr>()
                .map_err(|e| BusError::Connection(format!("bad address '{address}': {e}")))?;
            let stream = TcpStream::connect_timeout(&addr, timeout)?;
            stream.set_nodelay(true)?;
            tracing::debug!(address, "connected");
            self.streams.insert(address.to_string(), stream);
        }
        let stream = self
            .streams
            .get_mut(address)
            .ok_or_else(|| BusError::Connection("stream vanished".into()))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(stream)
    }

    /// Read a single input register, returning its raw 16-bit value.
    pub fn read_input_register(
        &mut self,
        address: &str,
        unit_id: u8,
        register: u16,
        timeout: Duration,
    ) -> Result<u16, BusError> {
        self.next_txn = self.next_txn.wrapping_add(1);
        let txn = self.next_txn;

        let result = (|| {
            let stream = self.stream(address, timeout)?;

            // MBAP header + PDU: txn, protocol 0, length 6, unit, fn, addr, count
            let mut req = [0u8; MBAP_LEN + 5];
            req[0..2].copy_from_slice(&txn.to_be_bytes());
            req[4..6].copy_from_slice(&6u16.to_be_bytes());
            req[6] = unit_id;
            req[7] = FN_READ_INPUT_REGISTERS;
            req[8..10].copy_from_slice(&register.to_be_bytes());
            req[10..12].copy_from_slice(&1u16.to_be_bytes());
            stream.write_all(&req)?;

            let mut header = [0u8; MBAP_LEN];
            stream.read_exact(&mut header)?;
            let resp_txn = u16::from_be_bytes([header[0], header[1]]);
            if resp_txn != txn {
                return Err(BusError::Protocol(format!(
                    "transaction mismatch: sent {txn}, got {resp_txn}"
                )));
            }
            let body_len = u16::from_be_bytes([header[4], header[5]]) as usize;
            if body_len < 2 || body_len > 253 {
                return Err(BusError::Protocol(format!("bad frame length {body_len}")));
            }
            let mut body = vec![0u8; body_len - 1];
            stream.read_exact(&mut body)?;

            let function = body[0];
            if function == FN_READ_INPUT_REGISTERS | 0x80 {
                let code = body.get(1).copied().unwrap_or(0);
                return Err(BusError::Protocol(format!("exception code {code}")));
            }
            if function != FN_READ_INPUT_REGISTERS || body.len() < 4 {
                return Err(BusError::Protocol(format!("unexpected function {function}")));
            }
            Ok(u16::from_be_bytes([body[2], body[3]]))
        })();

        // Drop the stream on any failure so the next call reconnects.
        if result.is_err() {
            self.streams.remove(address);
        }
        result
    }
}

impl Default for TcpReader {
    fn default() -> Self {
        Self::new()
    }
}

impl dwp_traits::RegisterReader for TcpReader {
    fn read(
        &mut self,
        address: &str,
        unit_id: u8,
        channels: &[(&str, u16)],
        timeout: Duration,
    ) -> Result<HashMap<String, i32>, Box<dyn std::error::Error + Send + Sync>> {
        let mut values = HashMap::with_capacity(channels.len());
        for (name, register) in channels {
            let raw = self.read_input_register(address, unit_id, *register, timeout)?;
            values.insert((*name).to_string(), i32::from(raw as i16));
        }
        Ok(values)
    }
}
