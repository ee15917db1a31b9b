//! Fan-out of slice-ready events to interested consumers.

mod hub;

pub use hub::{
    NotificationHub, SliceEvent, SliceOrigin, SliceSubscription, SubscriberId,
};
