//! Test doubles shared by state and application tests.

mod fake_api;
mod fixtures;

pub(crate) use fake_api::FakeApi;
pub(crate) use fixtures::{bank_snapshot, identity, room_snapshot, ROOM_ID};
