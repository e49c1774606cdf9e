use super::*;

use crate::accounting::Reply;
use crate::FieldText;

#[test]
fn obfuscated_packet_wrong_unencrypted_flag() {
    // body doesn't matter (error should be returned before getting there) so we can omit it
    let mut raw_packet = [
        0xc << 4, // version (minor v0)
        3,        // accounting packet
        2,        // sequence number
        1,        // unencrypted flag - shouldn't be set!
        // session id
        0,
        0,
        0,
        0,
        // body length (doesn't matter)
        0,
        0,
        0,
        0,
    ];

    let deserialize_error = Packet::<Reply>::deserialize(b"supersecret", &mut raw_packet)
        .expect_err("packet deserialization should have failed");
    assert_eq!(
        deserialize_error,
        DeserializeError::IncorrectUnencryptedFlag
    );
}

#[test]
fn wrong_packet_type_rejected() {
    let raw_packet = [
        0xc << 4, // version
        1,        // authentication packet, but we're expecting accounting
        2,        // sequence number
        1,        // unencrypted
        0, 0, 0, 0, // session id
        0, 0, 0, 0, // body length
    ];

    assert_eq!(
        Packet::<Reply>::deserialize_unobfuscated(&raw_packet),
        Err(DeserializeError::PacketTypeMismatch {
            expected: PacketType::Accounting,
            actual: 1
        })
    );
}

#[test]
fn bad_major_version_rejected() {
    let raw_packet = [0xd << 4, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(
        Packet::<Reply>::deserialize_unobfuscated(&raw_packet),
        Err(DeserializeError::VersionMismatch)
    );
}

#[test]
fn truncated_body_rejected() {
    let raw_packet = [
        0xc << 4, 3, 2, 1, // version, type, sequence number, flags
        0, 0, 0, 1, // session id
        0, 0, 0, 20, // body length longer than buffer
        0, 0, 0, 0, 1,
    ];

    assert_eq!(
        Packet::<Reply>::deserialize_unobfuscated(&raw_packet),
        Err(DeserializeError::UnexpectedEnd)
    );
}

#[test]
fn header_too_short() {
    assert_eq!(
        HeaderInfo::try_from([0xc0, 1, 1].as_slice()),
        Err(DeserializeError::UnexpectedEnd)
    );
}

#[test]
fn version_byte_conversion() {
    let version = Version::new(MajorVersion::RFC8907, MinorVersion::V1);
    assert_eq!(u8::from(version), 0xc1);
    assert_eq!(Version::try_from(0xc0u8), Ok(Version::new(MajorVersion::RFC8907, MinorVersion::Default)));
    assert_eq!(Version::try_from(0xc7u8), Err(DeserializeError::VersionMismatch));
}

#[test]
fn serialize_sets_header_fields() {
    let header = HeaderInfo::new(
        Version::new(MajorVersion::RFC8907, MinorVersion::Default),
        4,
        PacketFlags::UNENCRYPTED | PacketFlags::SINGLE_CONNECTION,
        0x01020304,
    );
    let packet = Packet::new(
        header,
        Reply {
            status: crate::accounting::Status::Success,
            server_message: FieldText::default(),
            data: &[],
        },
    )
    .unwrap();

    let mut buffer = [0u8; 32];
    let length = packet.serialize(b"key", &mut buffer).unwrap();

    assert_eq!(length, 17);
    assert_eq!(
        &buffer[..12],
        &[0xc0, 3, 4, PacketFlags::SINGLE_CONNECTION.bits(), 1, 2, 3, 4, 0, 0, 0, 5]
    );
}

#[test]
fn serialize_not_enough_space() {
    let header = HeaderInfo::new(
        Version::new(MajorVersion::RFC8907, MinorVersion::Default),
        2,
        PacketFlags::empty(),
        1,
    );
    let packet = Packet::new(
        header,
        Reply {
            status: crate::accounting::Status::Success,
            server_message: FieldText::default(),
            data: &[],
        },
    )
    .unwrap();

    let mut buffer = [0u8; 12];
    assert_eq!(
        packet.serialize(b"key", &mut buffer),
        Err(SerializeError::NotEnoughSpace)
    );
}
