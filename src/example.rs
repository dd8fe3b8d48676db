//! Mocks for doc examples
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_io::{ErrorType, Read, ReadReady, Write};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// HTTP response delivered for any GET request
const HTTP_RESPONSE: &[u8] =
    b"+IPD,0,54:HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nnice to see you!CLOSED\r\n";

/// Serial transport mock, replying to a few well known commands
#[derive(Default)]
pub struct ExampleTransport {
    /// Data written since the last flush
    outbound: Vec<u8>,

    /// Pending reply data
    inbound: VecDeque<u8>,
}

impl ExampleTransport {
    fn reply(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter().copied());
    }

    fn handle(&mut self, frame: &[u8]) {
        match frame {
            b"AT+CWJAP_CUR=\"test_wifi\",\"secret\"\r\n" => {
                self.reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
            }
            b"AT+CWJAP_CUR?\r\n" => {
                self.reply(b"+CWJAP_CUR:\"test_wifi\",\"10:fe:ed:05:ba:50\",6,-42\r\n\r\nOK\r\n");
            }
            b"AT+CIPSTA_CUR?\r\n" => {
                self.reply(b"+CIPSTA_CUR:ip:\"10.0.0.181\"\r\n");
                self.reply(b"+CIPSTA_CUR:gateway:\"10.0.0.1\"\r\n");
                self.reply(b"+CIPSTA_CUR:netmask:\"255.255.255.0\"\r\n\r\nOK\r\n");
            }
            b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",80\r\n" => self.reply(b"CONNECT\r\n\r\nOK\r\n"),
            frame if frame.starts_with(b"AT+CIPSEND=") => self.reply(b"\r\nOK\r\n> "),
            frame if frame.starts_with(b"GET ") => {
                self.reply(b"\r\nRecv ");
                let mut buffer = [0x0; 20];
                self.reply(numtoa::NumToA::numtoa(frame.len(), 10, &mut buffer));
                self.reply(b" bytes\r\n\r\nSEND OK\r\n");
                self.reply(HTTP_RESPONSE);
            }
            _ => self.reply(b"\r\nOK\r\n"),
        }
    }
}

impl ErrorType for ExampleTransport {
    type Error = Infallible;
}

impl Read for ExampleTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => buf[count] = byte,
                None => break,
            }
            count += 1;
        }

        Ok(count)
    }
}

impl ReadReady for ExampleTransport {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbound.is_empty())
    }
}

impl Write for ExampleTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let frame = core::mem::take(&mut self.outbound);
        self.handle(&frame);
        Ok(())
    }
}

/// Timer mock. Time just advances while waiting.
#[derive(Default)]
pub struct ExampleTimer {
    now: u32,
    until: u32,
}

impl Timer<1_000> for ExampleTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        TimerInstantU32::from_ticks(self.now)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.until = self.now + duration.ticks();
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.until = self.now;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        self.now = self.until;
        Ok(())
    }
}
