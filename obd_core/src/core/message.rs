use super::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageType {
    /// Some action to do; the payload is a command line
    Command,
    /// Reply to a command
    Reply,
    /// A console message
    #[default]
    Message,
    /// A warning to log and forward to consoles
    Warning,
    /// An error to log and forward to consoles
    Error,
    /// Raw input coming from outside the controller
    Input,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageType::Command => "Command",
            MessageType::Reply => "Reply",
            MessageType::Message => "Message",
            MessageType::Warning => "Warning",
            MessageType::Error => "Error",
            MessageType::Input => "Input",
        };
        f.write_str(label)
    }
}

/// Rendering of integers appended to a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Plain decimal
    #[default]
    Auto,
    Decimal,
    /// Two zero-padded lowercase hex digits per byte, most significant byte first
    Hexadecimal,
    /// Eight zero-padded bits per byte, most significant byte first
    Binary,
    /// Out-of-range format code; prints nothing
    Unsupported(u8),
}

impl Format {
    /// Decode a raw format code as received from a command parameter
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Format::Auto,
            1 => Format::Decimal,
            2 => Format::Hexadecimal,
            3 => Format::Binary,
            other => Format::Unsupported(other),
        }
    }
}

/// Integers that can be printed into a payload.
///
/// `to_bits` yields the two's complement pattern of the value, zero-extended
/// from `BYTES` bytes, so signed values render their raw bits in hex/binary.
pub trait MessageInteger: Copy + fmt::Display {
    const BYTES: usize;

    fn to_bits(self) -> u64;
}

macro_rules! impl_message_integer {
    ($($int:ty => $bits:ty),* $(,)?) => {
        $(
            impl MessageInteger for $int {
                const BYTES: usize = std::mem::size_of::<$int>();

                #[inline]
                fn to_bits(self) -> u64 {
                    self as $bits as u64
                }
            }
        )*
    };
}

impl_message_integer!(
    i8 => u8,
    u8 => u8,
    i16 => u16,
    u16 => u16,
    i32 => u32,
    u32 => u32,
    i64 => u64,
    u64 => u64,
);

/// A message travelling between nodes.
///
/// The payload is free text for conversational types and a space separated
/// command line for [`MessageType::Command`]. Once handed to the messenger a
/// message is only ever copied, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    message_type: MessageType,
    source: Address,
    destination: Address,
    payload: String,
}

impl Message {
    /// Empty console message
    pub fn new(source: Address, destination: Address) -> Self {
        Self::with_type(source, destination, MessageType::Message)
    }

    /// Empty message of the given type
    pub fn with_type(source: Address, destination: Address, message_type: MessageType) -> Self {
        Self {
            message_type,
            source,
            destination,
            payload: String::new(),
        }
    }

    pub fn with_payload(
        source: Address,
        destination: Address,
        payload: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            message_type,
            source,
            destination,
            payload: payload.into(),
        }
    }

    /// Command line addressed to `destination`
    pub fn command(source: Address, destination: Address, line: impl Into<String>) -> Self {
        Self::with_payload(source, destination, line, MessageType::Command)
    }

    pub fn set_payload(&mut self, payload: impl Into<String>) {
        self.payload = payload.into();
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn set_type(&mut self, message_type: MessageType) {
        self.message_type = message_type;
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn source(&self) -> Address {
        self.source
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    /// Empty the payload, keeping the type
    pub fn clear(&mut self) {
        self.payload.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    // Command line access

    /// Payload up to the first space, or the whole payload
    pub fn base_command(&self) -> &str {
        match self.payload.find(' ') {
            Some(idx) => &self.payload[..idx],
            None => &self.payload,
        }
    }

    pub fn has_params(&self) -> bool {
        self.payload.contains(' ')
    }

    /// Payload after the first space, or empty
    pub fn param_str(&self) -> &str {
        match self.payload.find(' ') {
            Some(idx) => &self.payload[idx + 1..],
            None => "",
        }
    }

    /// Parameter tokens; repeated separators collapse and no token is empty
    pub fn params(&self) -> Vec<&str> {
        self.param_str().split_whitespace().collect()
    }

    // Addressing

    /// Human-readable text rather than a command or protocol traffic
    pub fn is_message(&self) -> bool {
        matches!(
            self.message_type,
            MessageType::Error | MessageType::Warning | MessageType::Message
        )
    }

    pub fn is_for_all(&self) -> bool {
        self.destination.is_broadcast()
    }

    pub fn is_for_me(&self, address: Address) -> bool {
        self.is_for_all() || self.destination == address
    }

    // Payload building

    pub fn print(&mut self, text: &str) {
        self.payload.push_str(text);
    }

    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.newline();
    }

    pub fn newline(&mut self) {
        self.payload.push('\n');
    }

    pub fn print_bool(&mut self, value: bool) {
        self.print(if value { "true" } else { "false" });
    }

    pub fn println_bool(&mut self, value: bool) {
        self.print_bool(value);
        self.newline();
    }

    pub fn print_int<T: MessageInteger>(&mut self, value: T, format: Format) {
        match format {
            Format::Auto | Format::Decimal => self.payload.push_str(&value.to_string()),
            Format::Hexadecimal | Format::Binary => {
                self.print_bytes(value.to_bits(), T::BYTES, format)
            }
            Format::Unsupported(_) => {}
        }
    }

    pub fn println_int<T: MessageInteger>(&mut self, value: T, format: Format) {
        self.print_int(value, format);
        self.newline();
    }

    /// Fixed-point rendering with `digits` decimals
    pub fn print_float(&mut self, value: f64, digits: usize) {
        self.payload.push_str(&format!("{:.*}", digits, value));
    }

    pub fn println_float(&mut self, value: f64, digits: usize) {
        self.print_float(value, digits);
        self.newline();
    }

    /// Split wide values into halves, high half first, until single bytes remain
    fn print_bytes(&mut self, bits: u64, bytes: usize, format: Format) {
        if bytes > 1 {
            let low_bytes = bytes / 2;
            let shift = low_bytes * 8;
            self.print_bytes(bits >> shift, bytes - low_bytes, format);
            self.print_bytes(bits & ((1u64 << shift) - 1), low_bytes, format);
            return;
        }
        let byte = (bits & 0xff) as u8;
        match format {
            Format::Hexadecimal => self.payload.push_str(&format!("{:02x}", byte)),
            Format::Binary => self.payload.push_str(&format!("{:08b}", byte)),
            _ => {}
        }
    }
}

impl fmt::Write for Message {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.payload.push_str(s);
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {}: {}",
            self.message_type, self.source, self.destination, self.payload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    fn addr(raw: u32) -> Address {
        Address::new(raw)
    }

    #[test]
    fn test_construction() {
        let msg = Message::new(addr(1), addr(2));
        assert_eq!(msg.message_type(), MessageType::Message);
        assert_eq!(msg.source(), addr(1));
        assert_eq!(msg.destination(), addr(2));
        assert!(msg.is_empty());

        let mut cmd = Message::with_payload(addr(1), addr(2), "info", MessageType::Command);
        assert_eq!(cmd.payload(), "info");
        cmd.clear();
        assert!(cmd.is_empty());
        assert_eq!(cmd.message_type(), MessageType::Command);
        cmd.set_type(MessageType::Reply);
        cmd.set_payload("done");
        assert_eq!(cmd.message_type(), MessageType::Reply);
        assert_eq!(cmd.payload(), "done");
    }

    #[test]
    fn test_addressing() {
        let targeted = Message::new(addr(0), addr(5));
        assert!(targeted.is_for_me(targeted.destination()));
        assert!(!targeted.is_for_me(addr(6)));
        assert!(!targeted.is_for_all());

        let broadcast = Message::new(addr(5), Address::BROADCAST);
        assert!(broadcast.is_for_all());
        for raw in [0, 1, 42, u32::MAX] {
            assert!(broadcast.is_for_me(addr(raw)));
        }
    }

    #[test]
    fn test_is_message() {
        let mut msg = Message::new(addr(1), addr(2));
        for (message_type, expected) in [
            (MessageType::Command, false),
            (MessageType::Reply, false),
            (MessageType::Message, true),
            (MessageType::Warning, true),
            (MessageType::Error, true),
            (MessageType::Input, false),
        ] {
            msg.set_type(message_type);
            assert_eq!(msg.is_message(), expected, "{}", message_type);
        }
    }

    #[test]
    fn test_command_parsing() {
        let cd = Message::command(addr(1), addr(2), "cd /tmp");
        assert_eq!(cd.base_command(), "cd");
        assert!(cd.has_params());
        assert_eq!(cd.param_str(), "/tmp");
        assert_eq!(cd.params(), vec!["/tmp"]);

        let info = Message::command(addr(1), addr(2), "info");
        assert_eq!(info.base_command(), "info");
        assert!(!info.has_params());
        assert_eq!(info.param_str(), "");
        assert!(info.params().is_empty());

        let spaced = Message::command(addr(1), addr(2), "cp  a   b ");
        assert_eq!(spaced.base_command(), "cp");
        assert_eq!(spaced.params(), vec!["a", "b"]);
    }

    #[test]
    fn test_hex_then_decimal() {
        let mut msg = Message::new(addr(1), addr(2));
        msg.println_int(71u8, Format::Hexadecimal);
        assert_eq!(msg.payload(), "47\n");
        msg.clear();
        msg.println_int(71u8, Format::Decimal);
        assert_eq!(msg.payload(), "71\n");
    }

    #[test]
    fn test_integer_formats() {
        let mut msg = Message::new(addr(1), addr(2));
        msg.print_int(0x1234u16, Format::Hexadecimal);
        assert_eq!(msg.payload(), "1234");

        msg.clear();
        msg.print_int(0xdead_beefu32, Format::Hexadecimal);
        assert_eq!(msg.payload(), "deadbeef");

        msg.clear();
        msg.print_int(1u64, Format::Hexadecimal);
        assert_eq!(msg.payload(), "0000000000000001");

        msg.clear();
        msg.print_int(5u8, Format::Binary);
        assert_eq!(msg.payload(), "00000101");

        msg.clear();
        msg.print_int(0x0102u16, Format::Binary);
        assert_eq!(msg.payload(), "0000000100000010");

        msg.clear();
        msg.print_int(-1i8, Format::Hexadecimal);
        assert_eq!(msg.payload(), "ff");

        msg.clear();
        msg.print_int(-2i32, Format::Auto);
        assert_eq!(msg.payload(), "-2");

        msg.clear();
        msg.print_int(-1i16, Format::Binary);
        assert_eq!(msg.payload(), "1".repeat(16));
    }

    #[test]
    fn test_unsupported_format_prints_nothing() {
        let mut msg = Message::new(addr(1), addr(2));
        msg.print_int(12u32, Format::from_code(9));
        assert!(msg.is_empty());
        msg.println_int(12u32, Format::from_code(200));
        assert_eq!(msg.payload(), "\n");
        assert_eq!(Format::from_code(2), Format::Hexadecimal);
    }

    #[test]
    fn test_text_building() {
        let mut msg = Message::new(addr(1), addr(2));
        msg.print("speed ");
        msg.print_float(3.14159, 2);
        msg.newline();
        msg.print("armed ");
        msg.println_bool(true);
        msg.println("end");
        write!(msg, "{}-{}", 1, 2).unwrap();
        assert_eq!(msg.payload(), "speed 3.14\narmed true\nend\n1-2");
    }

    #[test]
    fn test_serde_roundtrip() {
        let msg = Message::command(addr(3), addr(4), "date now");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
