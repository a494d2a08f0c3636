//! The packet model and its encode/decode routines.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{
    MAX_REMAINING_LENGTH, Reader, check_field, field_len, put_binary, put_remaining_length,
    put_string, read_remaining_length, remaining_length_size,
};
use crate::error::{PacketError, PacketResult};
use crate::types::{ConnackCode, PacketType, ProtocolVersion, QoS};

/// Last will message registered by CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    /// Topic the will is published to
    pub topic: String,
    /// Will payload
    pub payload: Bytes,
    /// QoS used when the will is published
    pub qos: QoS,
    /// Whether the will is retained
    pub retain: bool,
}

/// CONNECT: the first packet a client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    /// Protocol revision
    pub version: ProtocolVersion,
    /// Client identifier, may be empty for clean sessions
    pub client_id: String,
    /// Discard any previous session state
    pub clean_session: bool,
    /// Keep alive interval in seconds, 0 disables it
    pub keep_alive: u16,
    /// Optional last will
    pub will: Option<Will>,
    /// Optional username
    pub username: Option<String>,
    /// Optional password, only valid together with a username
    pub password: Option<Bytes>,
}

impl Default for Connect {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::V311,
            client_id: String::new(),
            clean_session: true,
            keep_alive: 60,
            will: None,
            username: None,
            password: None,
        }
    }
}

impl Connect {
    /// Creates a clean-session CONNECT for `client_id`.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.username.is_some() {
            flags |= 0x80;
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        if let Some(will) = &self.will {
            flags |= 0x04 | ((will.qos as u8) << 3);
            if will.retain {
                flags |= 0x20;
            }
        }
        if self.clean_session {
            flags |= 0x02;
        }
        flags
    }

    fn remaining_length(&self) -> usize {
        let mut len = field_len(self.version.protocol_name().len()) + 4;
        len += field_len(self.client_id.len());
        if let Some(will) = &self.will {
            len += field_len(will.topic.len()) + field_len(will.payload.len());
        }
        if let Some(username) = &self.username {
            len += field_len(username.len());
        }
        if let Some(password) = &self.password {
            len += field_len(password.len());
        }
        len
    }

    fn validate(&self) -> PacketResult<()> {
        check_field(self.client_id.len())?;
        if let Some(will) = &self.will {
            if will.topic.is_empty() {
                return Err(PacketError::EmptyTopic);
            }
            check_field(will.topic.len())?;
            check_field(will.payload.len())?;
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(PacketError::PasswordWithoutUsername);
        }
        if let Some(username) = &self.username {
            check_field(username.len())?;
        }
        if let Some(password) = &self.password {
            check_field(password.len())?;
        }
        Ok(())
    }

    fn write(&self, buf: &mut BytesMut) {
        put_string(buf, self.version.protocol_name());
        buf.put_u8(self.version.level());
        buf.put_u8(self.flags());
        buf.put_u16(self.keep_alive);
        put_string(buf, &self.client_id);
        if let Some(will) = &self.will {
            put_string(buf, &will.topic);
            put_binary(buf, &will.payload);
        }
        if let Some(username) = &self.username {
            put_string(buf, username);
        }
        if let Some(password) = &self.password {
            put_binary(buf, password);
        }
    }

    fn read(r: &mut Reader) -> PacketResult<Self> {
        let name = r.string()?;
        let level = r.u8()?;
        let version = match (name.as_str(), level) {
            ("MQTT", 4) => ProtocolVersion::V311,
            ("MQIsdp", 3) => ProtocolVersion::V31,
            ("MQTT" | "MQIsdp", _) => return Err(PacketError::InvalidProtocolLevel(level)),
            _ => return Err(PacketError::InvalidProtocolName(name)),
        };

        let flags = r.u8()?;
        let has_will = flags & 0x04 != 0;
        let will_retain = flags & 0x20 != 0;
        let will_qos_bits = (flags >> 3) & 0x03;
        if flags & 0x01 != 0 || (!has_will && (will_retain || will_qos_bits != 0)) {
            return Err(PacketError::InvalidConnectFlags(flags));
        }
        let will_qos = QoS::try_from(will_qos_bits)?;
        let has_username = flags & 0x80 != 0;
        let has_password = flags & 0x40 != 0;
        if has_password && !has_username {
            return Err(PacketError::PasswordWithoutUsername);
        }

        let keep_alive = r.u16()?;
        let client_id = r.string()?;
        let will = if has_will {
            let topic = r.string()?;
            if topic.is_empty() {
                return Err(PacketError::EmptyTopic);
            }
            Some(Will {
                topic,
                payload: r.binary()?,
                qos: will_qos,
                retain: will_retain,
            })
        } else {
            None
        };
        let username = if has_username { Some(r.string()?) } else { None };
        let password = if has_password { Some(r.binary()?) } else { None };

        Ok(Self {
            version,
            client_id,
            clean_session: flags & 0x02 != 0,
            keep_alive,
            will,
            username,
            password,
        })
    }
}

/// CONNACK: the server's answer to CONNECT.
///
/// The return code is kept as a raw byte so that out-of-range values can be
/// represented; they are rejected when encoding or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connack {
    /// A previous session was resumed
    pub session_present: bool,
    /// Raw return code, see [`ConnackCode`]
    pub return_code: u8,
}

impl Default for Connack {
    fn default() -> Self {
        Self::new(ConnackCode::Accepted)
    }
}

impl Connack {
    /// Creates a CONNACK without a present session.
    pub fn new(code: ConnackCode) -> Self {
        Self {
            session_present: false,
            return_code: code as u8,
        }
    }

    /// The typed return code, if it is a defined one.
    pub fn code(&self) -> Option<ConnackCode> {
        ConnackCode::try_from(self.return_code).ok()
    }

    fn validate(&self) -> PacketResult<()> {
        ConnackCode::try_from(self.return_code).map(|_| ())
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(self.session_present));
        buf.put_u8(self.return_code);
    }

    fn read(r: &mut Reader) -> PacketResult<Self> {
        let flags = r.u8()?;
        if flags & !0x01 != 0 {
            return Err(PacketError::InvalidConnackFlags(flags));
        }
        let return_code = r.u8()?;
        ConnackCode::try_from(return_code)?;
        Ok(Self {
            session_present: flags & 0x01 != 0,
            return_code,
        })
    }
}

/// PUBLISH: an application message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Publish {
    /// Topic name
    pub topic: String,
    /// Application payload
    pub payload: Bytes,
    /// Delivery guarantee
    pub qos: QoS,
    /// Retain flag
    pub retain: bool,
    /// Redelivery flag, only valid above QoS 0
    pub dup: bool,
    /// Packet identifier, 0 for QoS 0 and non-zero otherwise
    pub packet_id: u16,
}

impl Publish {
    /// Creates a QoS 0 message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    fn flags(&self) -> u8 {
        (u8::from(self.dup) << 3) | ((self.qos as u8) << 1) | u8::from(self.retain)
    }

    fn remaining_length(&self) -> usize {
        let id_len = if self.qos == QoS::AtMostOnce { 0 } else { 2 };
        field_len(self.topic.len()) + id_len + self.payload.len()
    }

    fn validate(&self) -> PacketResult<()> {
        if self.topic.is_empty() {
            return Err(PacketError::EmptyTopic);
        }
        check_field(self.topic.len())?;
        match self.qos {
            QoS::AtMostOnce if self.packet_id != 0 => Err(PacketError::UnexpectedPacketId),
            QoS::AtMostOnce if self.dup => Err(PacketError::InvalidDup),
            QoS::AtLeastOnce | QoS::ExactlyOnce if self.packet_id == 0 => {
                Err(PacketError::ZeroPacketId(PacketType::Publish))
            }
            _ => Ok(()),
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        put_string(buf, &self.topic);
        if self.qos != QoS::AtMostOnce {
            buf.put_u16(self.packet_id);
        }
        buf.put_slice(&self.payload);
    }

    fn read(r: &mut Reader, flags: u8) -> PacketResult<Self> {
        let qos = QoS::try_from((flags >> 1) & 0x03)?;
        let dup = flags & 0x08 != 0;
        if qos == QoS::AtMostOnce && dup {
            return Err(PacketError::InvalidDup);
        }
        let topic = r.string()?;
        if topic.is_empty() {
            return Err(PacketError::EmptyTopic);
        }
        let packet_id = if qos == QoS::AtMostOnce {
            0
        } else {
            read_packet_id(r, PacketType::Publish)?
        };
        Ok(Self {
            topic,
            payload: r.rest(),
            qos,
            retain: flags & 0x01 != 0,
            dup,
            packet_id,
        })
    }
}

/// One topic filter of a SUBSCRIBE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic filter
    pub topic: String,
    /// Maximum QoS requested
    pub qos: QoS,
}

/// SUBSCRIBE: request one or more subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    /// Packet identifier
    pub packet_id: u16,
    /// Requested subscriptions, at least one
    pub subscriptions: Vec<Subscription>,
}

impl Subscribe {
    fn remaining_length(&self) -> usize {
        2 + self
            .subscriptions
            .iter()
            .map(|s| field_len(s.topic.len()) + 1)
            .sum::<usize>()
    }

    fn validate(&self) -> PacketResult<()> {
        check_packet_id(self.packet_id, PacketType::Subscribe)?;
        if self.subscriptions.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Subscribe));
        }
        self.subscriptions
            .iter()
            .try_for_each(|s| check_topic(&s.topic))
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.packet_id);
        for subscription in &self.subscriptions {
            put_string(buf, &subscription.topic);
            buf.put_u8(subscription.qos as u8);
        }
    }

    fn read(r: &mut Reader) -> PacketResult<Self> {
        let packet_id = read_packet_id(r, PacketType::Subscribe)?;
        let mut subscriptions = Vec::new();
        while r.has_remaining() {
            let topic = r.string()?;
            if topic.is_empty() {
                return Err(PacketError::EmptyTopic);
            }
            let qos = QoS::try_from(r.u8()?)?;
            subscriptions.push(Subscription { topic, qos });
        }
        if subscriptions.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Subscribe));
        }
        Ok(Self {
            packet_id,
            subscriptions,
        })
    }
}

/// SUBACK: granted QoS per requested subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suback {
    /// Identifier of the acknowledged SUBSCRIBE
    pub packet_id: u16,
    /// One code per subscription: 0, 1, 2 or 0x80 (failure)
    pub return_codes: Vec<u8>,
}

impl Suback {
    /// Return code signalling a rejected subscription.
    pub const FAILURE: u8 = 0x80;

    fn validate(&self) -> PacketResult<()> {
        check_packet_id(self.packet_id, PacketType::Suback)?;
        if self.return_codes.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Suback));
        }
        self.return_codes.iter().try_for_each(|&c| check_suback_code(c))
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.packet_id);
        buf.put_slice(&self.return_codes);
    }

    fn read(r: &mut Reader) -> PacketResult<Self> {
        let packet_id = read_packet_id(r, PacketType::Suback)?;
        let return_codes = r.rest().to_vec();
        if return_codes.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Suback));
        }
        return_codes.iter().try_for_each(|&c| check_suback_code(c))?;
        Ok(Self {
            packet_id,
            return_codes,
        })
    }
}

/// UNSUBSCRIBE: drop one or more subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    /// Packet identifier
    pub packet_id: u16,
    /// Topic filters to remove, at least one
    pub topics: Vec<String>,
}

impl Unsubscribe {
    fn remaining_length(&self) -> usize {
        2 + self.topics.iter().map(|t| field_len(t.len())).sum::<usize>()
    }

    fn validate(&self) -> PacketResult<()> {
        check_packet_id(self.packet_id, PacketType::Unsubscribe)?;
        if self.topics.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Unsubscribe));
        }
        self.topics.iter().try_for_each(|t| check_topic(t))
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.packet_id);
        for topic in &self.topics {
            put_string(buf, topic);
        }
    }

    fn read(r: &mut Reader) -> PacketResult<Self> {
        let packet_id = read_packet_id(r, PacketType::Unsubscribe)?;
        let mut topics = Vec::new();
        while r.has_remaining() {
            let topic = r.string()?;
            if topic.is_empty() {
                return Err(PacketError::EmptyTopic);
            }
            topics.push(topic);
        }
        if topics.is_empty() {
            return Err(PacketError::EmptyPayload(PacketType::Unsubscribe));
        }
        Ok(Self { packet_id, topics })
    }
}

fn check_packet_id(packet_id: u16, packet_type: PacketType) -> PacketResult<()> {
    if packet_id == 0 {
        return Err(PacketError::ZeroPacketId(packet_type));
    }
    Ok(())
}

fn check_topic(topic: &str) -> PacketResult<()> {
    if topic.is_empty() {
        return Err(PacketError::EmptyTopic);
    }
    check_field(topic.len())
}

fn check_suback_code(code: u8) -> PacketResult<()> {
    match code {
        0..=2 | Suback::FAILURE => Ok(()),
        other => Err(PacketError::InvalidSubackCode(other)),
    }
}

fn read_packet_id(r: &mut Reader, packet_type: PacketType) -> PacketResult<u16> {
    let packet_id = r.u16()?;
    check_packet_id(packet_id, packet_type)?;
    Ok(packet_id)
}

/// An MQTT 3.1.1 control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// CONNECT
    Connect(Connect),
    /// CONNACK
    Connack(Connack),
    /// PUBLISH
    Publish(Publish),
    /// PUBACK with its packet identifier
    Puback(u16),
    /// PUBREC with its packet identifier
    Pubrec(u16),
    /// PUBREL with its packet identifier
    Pubrel(u16),
    /// PUBCOMP with its packet identifier
    Pubcomp(u16),
    /// SUBSCRIBE
    Subscribe(Subscribe),
    /// SUBACK
    Suback(Suback),
    /// UNSUBSCRIBE
    Unsubscribe(Unsubscribe),
    /// UNSUBACK with its packet identifier
    Unsuback(u16),
    /// PINGREQ
    Pingreq,
    /// PINGRESP
    Pingresp,
    /// DISCONNECT
    Disconnect,
}

impl Packet {
    /// The packet's type.
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect(_) => PacketType::Connect,
            Self::Connack(_) => PacketType::Connack,
            Self::Publish(_) => PacketType::Publish,
            Self::Puback(_) => PacketType::Puback,
            Self::Pubrec(_) => PacketType::Pubrec,
            Self::Pubrel(_) => PacketType::Pubrel,
            Self::Pubcomp(_) => PacketType::Pubcomp,
            Self::Subscribe(_) => PacketType::Subscribe,
            Self::Suback(_) => PacketType::Suback,
            Self::Unsubscribe(_) => PacketType::Unsubscribe,
            Self::Unsuback(_) => PacketType::Unsuback,
            Self::Pingreq => PacketType::Pingreq,
            Self::Pingresp => PacketType::Pingresp,
            Self::Disconnect => PacketType::Disconnect,
        }
    }

    fn header_flags(&self) -> u8 {
        match self {
            Self::Publish(publish) => publish.flags(),
            other => other.packet_type().fixed_flags(),
        }
    }

    fn remaining_length(&self) -> usize {
        match self {
            Self::Connect(connect) => connect.remaining_length(),
            Self::Connack(_) => 2,
            Self::Publish(publish) => publish.remaining_length(),
            Self::Puback(_) | Self::Pubrec(_) | Self::Pubrel(_) | Self::Pubcomp(_) => 2,
            Self::Subscribe(subscribe) => subscribe.remaining_length(),
            Self::Suback(suback) => 2 + suback.return_codes.len(),
            Self::Unsubscribe(unsubscribe) => unsubscribe.remaining_length(),
            Self::Unsuback(_) => 2,
            Self::Pingreq | Self::Pingresp | Self::Disconnect => 0,
        }
    }

    /// Total encoded length: header byte, remaining length field and body.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let remaining = self.remaining_length();
        1 + remaining_length_size(remaining) + remaining
    }

    /// Checks every field without encoding.
    pub fn validate(&self) -> PacketResult<()> {
        match self {
            Self::Connect(connect) => connect.validate(),
            Self::Connack(connack) => connack.validate(),
            Self::Publish(publish) => publish.validate(),
            Self::Puback(id) | Self::Pubrec(id) | Self::Pubrel(id) | Self::Pubcomp(id)
            | Self::Unsuback(id) => check_packet_id(*id, self.packet_type()),
            Self::Subscribe(subscribe) => subscribe.validate(),
            Self::Suback(suback) => suback.validate(),
            Self::Unsubscribe(unsubscribe) => unsubscribe.validate(),
            Self::Pingreq | Self::Pingresp | Self::Disconnect => Ok(()),
        }
    }

    /// Encodes the packet into one complete frame.
    pub fn encode(&self) -> PacketResult<Bytes> {
        self.validate()?;
        let remaining = self.remaining_length();
        if remaining > MAX_REMAINING_LENGTH {
            return Err(PacketError::LengthTooLarge(remaining));
        }

        let mut buf = BytesMut::with_capacity(self.len());
        buf.put_u8(((self.packet_type() as u8) << 4) | self.header_flags());
        put_remaining_length(&mut buf, remaining);
        match self {
            Self::Connect(connect) => connect.write(&mut buf),
            Self::Connack(connack) => connack.write(&mut buf),
            Self::Publish(publish) => publish.write(&mut buf),
            Self::Puback(id) | Self::Pubrec(id) | Self::Pubrel(id) | Self::Pubcomp(id)
            | Self::Unsuback(id) => buf.put_u16(*id),
            Self::Subscribe(subscribe) => subscribe.write(&mut buf),
            Self::Suback(suback) => suback.write(&mut buf),
            Self::Unsubscribe(unsubscribe) => unsubscribe.write(&mut buf),
            Self::Pingreq | Self::Pingresp | Self::Disconnect => {}
        }
        Ok(buf.freeze())
    }

    /// Decodes exactly one complete frame.
    pub fn decode(frame: Bytes) -> PacketResult<Self> {
        let Some(&header) = frame.first() else {
            return Err(PacketError::IncompleteFrame);
        };
        let packet_type = PacketType::try_from(header >> 4)?;
        let flags = header & 0x0F;
        if packet_type != PacketType::Publish && flags != packet_type.fixed_flags() {
            return Err(PacketError::InvalidFlags { packet_type, flags });
        }

        let (declared, field) = read_remaining_length(&frame[1..])?;
        let body = frame.slice(1 + field..);
        if body.len() != declared {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: body.len(),
            });
        }

        let mut r = Reader::new(packet_type, body);
        let packet = match packet_type {
            PacketType::Connect => Self::Connect(Connect::read(&mut r)?),
            PacketType::Connack => Self::Connack(Connack::read(&mut r)?),
            PacketType::Publish => Self::Publish(Publish::read(&mut r, flags)?),
            PacketType::Puback => Self::Puback(read_packet_id(&mut r, packet_type)?),
            PacketType::Pubrec => Self::Pubrec(read_packet_id(&mut r, packet_type)?),
            PacketType::Pubrel => Self::Pubrel(read_packet_id(&mut r, packet_type)?),
            PacketType::Pubcomp => Self::Pubcomp(read_packet_id(&mut r, packet_type)?),
            PacketType::Subscribe => Self::Subscribe(Subscribe::read(&mut r)?),
            PacketType::Suback => Self::Suback(Suback::read(&mut r)?),
            PacketType::Unsubscribe => Self::Unsubscribe(Unsubscribe::read(&mut r)?),
            PacketType::Unsuback => Self::Unsuback(read_packet_id(&mut r, packet_type)?),
            PacketType::Pingreq => Self::Pingreq,
            PacketType::Pingresp => Self::Pingresp,
            PacketType::Disconnect => Self::Disconnect,
        };
        r.finish()?;
        Ok(packet)
    }
}

impl From<Connect> for Packet {
    fn from(packet: Connect) -> Self {
        Self::Connect(packet)
    }
}

impl From<Connack> for Packet {
    fn from(packet: Connack) -> Self {
        Self::Connack(packet)
    }
}

impl From<Publish> for Packet {
    fn from(packet: Publish) -> Self {
        Self::Publish(packet)
    }
}

impl From<Subscribe> for Packet {
    fn from(packet: Subscribe) -> Self {
        Self::Subscribe(packet)
    }
}

impl From<Suback> for Packet {
    fn from(packet: Suback) -> Self {
        Self::Suback(packet)
    }
}

impl From<Unsubscribe> for Packet {
    fn from(packet: Unsubscribe) -> Self {
        Self::Unsubscribe(packet)
    }
}
