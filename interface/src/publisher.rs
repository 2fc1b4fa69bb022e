//! # Publishers
//!
//! A [Publisher] forwards the output fields of the SOFB to the process variable layer.

use crate::{Data, UniqueIdentifier, Value};

/// Process variable publication interface
pub trait Publisher: Send + Sync {
    /// Publishes `value` to `field`
    fn publish(&self, field: &str, value: Value);
}

/// Typed publication of [Data]
pub trait Publish {
    /// Publishes `data` to the field of its unique identifier
    fn send<U>(&self, data: Data<U>)
    where
        U: UniqueIdentifier,
        Value: From<Data<U>>;
}
impl<P: Publisher + ?Sized> Publish for P {
    #[inline]
    fn send<U>(&self, data: Data<U>)
    where
        U: UniqueIdentifier,
        Value: From<Data<U>>,
    {
        let field = U::FIELD;
        self.publish(field, data.into());
    }
}

/// Publisher that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;
impl Publisher for Silent {
    fn publish(&self, field: &str, value: Value) {
        log::trace!("{field} <- {value}");
    }
}

/// Publisher backed by an unbounded [flume] channel
///
/// The receiving end is handed out by [Channel::new] to whoever consumes
/// the fields, e.g. the IOC layer.
#[derive(Debug, Clone)]
pub struct Channel {
    tx: flume::Sender<(String, Value)>,
}
impl Channel {
    /// Creates a new channel publisher and its receiver
    pub fn new() -> (Self, flume::Receiver<(String, Value)>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}
impl Publisher for Channel {
    fn publish(&self, field: &str, value: Value) {
        if self.tx.send((field.to_string(), value)).is_err() {
            log::trace!("{field} receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Counts {}
    impl UniqueIdentifier for Counts {
        const FIELD: &'static str = "Counts-Mon";
        type DataType = i64;
    }

    #[test]
    fn channel() {
        let (publisher, rx) = Channel::new();
        publisher.send(Data::<Counts>::new(7));
        assert_eq!(rx.try_recv().unwrap(), ("Counts-Mon".into(), Value::Int(7)));
        drop(rx);
        publisher.publish("Counts-Mon", Value::Int(8));
    }
}
