//! Protobuf fixtures for tests
//!
//! Builds the `sink.test` descriptors programmatically so no `protoc` run is
//! needed:
//!
//! ```text
//! message TestKey { string order_number = 1; string order_url = 2; }
//! enum Status { UNKNOWN = 0; COMPLETED = 1; }
//! message TestMessage {
//!   string order_number = 1; string order_url = 2; string order_details = 3;
//!   Status status = 4; TestKey key = 5; repeated string tags = 6;
//! }
//! message BookingLogMessage {
//!   string order_number = 1; float amount_paid_by_cash = 16;
//!   int64 customer_total_fare_without_surge = 52;
//! }
//! ```

use contracts::Record;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet,
};

use crate::ProtoSchemaProvider;

pub const TEST_KEY: &str = "sink.test.TestKey";
pub const TEST_MESSAGE: &str = "sink.test.TestMessage";
pub const BOOKING_MESSAGE: &str = "sink.test.BookingLogMessage";

/// Length-delimited field 1 claiming 16 bytes with only 3 present
pub const CORRUPT_BYTES: &[u8] = b"\x0a\x10abc";

fn field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        ..Default::default()
    }
}

fn typed_field(name: &str, number: i32, kind: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, kind)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// The `sink.test` descriptor set
pub fn descriptor_set() -> FileDescriptorSet {
    let status = EnumDescriptorProto {
        name: Some("Status".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("UNKNOWN".to_string()),
                number: Some(0),
                options: None,
            },
            EnumValueDescriptorProto {
                name: Some("COMPLETED".to_string()),
                number: Some(1),
                options: None,
            },
        ],
        ..Default::default()
    };

    let tags = FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field("tags", 6, Type::String)
    };

    let file = FileDescriptorProto {
        name: Some("sink_test.proto".to_string()),
        package: Some("sink.test".to_string()),
        syntax: Some("proto3".to_string()),
        enum_type: vec![status],
        message_type: vec![
            message(
                "TestKey",
                vec![
                    field("order_number", 1, Type::String),
                    field("order_url", 2, Type::String),
                ],
            ),
            message(
                "TestMessage",
                vec![
                    field("order_number", 1, Type::String),
                    field("order_url", 2, Type::String),
                    field("order_details", 3, Type::String),
                    typed_field("status", 4, Type::Enum, ".sink.test.Status"),
                    typed_field("key", 5, Type::Message, ".sink.test.TestKey"),
                    tags,
                ],
            ),
            message(
                "BookingLogMessage",
                vec![
                    field("order_number", 1, Type::String),
                    field("amount_paid_by_cash", 16, Type::Float),
                    field("customer_total_fare_without_surge", 52, Type::Int64),
                ],
            ),
        ],
        ..Default::default()
    };

    FileDescriptorSet { file: vec![file] }
}

/// Serialized descriptor set, as written by `protoc --descriptor_set_out`
pub fn descriptor_set_bytes() -> Vec<u8> {
    descriptor_set().encode_to_vec()
}

pub fn descriptor_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(descriptor_set())
        .expect("fixture descriptors are valid")
}

pub fn provider() -> ProtoSchemaProvider {
    ProtoSchemaProvider::from_pool(descriptor_pool())
}

fn new_message(name: &str) -> DynamicMessage {
    let descriptor = descriptor_pool()
        .get_message_by_name(name)
        .expect("fixture message exists");
    DynamicMessage::new(descriptor)
}

/// Encoded `TestKey`
pub fn test_key(order_number: &str) -> Vec<u8> {
    let mut key = new_message(TEST_KEY);
    key.set_field_by_number(1, Value::String(order_number.to_string()));
    key.encode_to_vec()
}

/// Encoded `TestMessage` with status, nested key and tags populated
pub fn test_message(order_number: &str, order_details: &str) -> Vec<u8> {
    let mut key = new_message(TEST_KEY);
    key.set_field_by_number(1, Value::String(order_number.to_string()));

    let mut message = new_message(TEST_MESSAGE);
    message.set_field_by_number(1, Value::String(order_number.to_string()));
    message.set_field_by_number(3, Value::String(order_details.to_string()));
    message.set_field_by_number(4, Value::EnumNumber(1));
    message.set_field_by_number(5, Value::Message(key));
    message.set_field_by_number(
        6,
        Value::List(vec![
            Value::String("express".to_string()),
            Value::String("fragile".to_string()),
        ]),
    );
    message.encode_to_vec()
}

/// Encoded `BookingLogMessage`
pub fn booking_message(order_number: &str, amount_paid_by_cash: f32, fare: i64) -> Vec<u8> {
    let mut message = new_message(BOOKING_MESSAGE);
    message.set_field_by_number(1, Value::String(order_number.to_string()));
    message.set_field_by_number(16, Value::F32(amount_paid_by_cash));
    message.set_field_by_number(52, Value::I64(fare));
    message.encode_to_vec()
}

/// Record with key order "ORDER-1-FROM-KEY" and value order "test-order"
pub fn test_record() -> Record {
    Record::new(
        test_key("ORDER-1-FROM-KEY"),
        test_message("test-order", "ORDER-DETAILS"),
        1,
        11,
    )
    .with_topic("test")
}

/// Record with a booking value (cash 12.3, fare 2000)
pub fn booking_record() -> Record {
    Record::new(
        test_key("ORDER-1-FROM-KEY"),
        booking_message("bookingOrderNumber", 12.3, 2000),
        1,
        11,
    )
    .with_topic("test")
}
