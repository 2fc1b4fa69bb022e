/*!
# sofb-interface

Interface definition between the SOFB units and the process variable layer.

Every field the SOFB publishes is identified by a type implementing [UniqueIdentifier]:
the type sets both the field name and the field data type.
Data is moved around wrapped into [Data] and handed over to a [Publisher].

The SOFB units are polled by worker threads invoking [Update::update].
*/

use log::{info, warn};

mod data;
pub use data::Data;
pub use sofb_uid_derive::UID;

mod value;
pub use value::Value;

mod publisher;
pub use publisher::{Channel, Publish, Publisher, Silent};

pub mod filing;

/// Defines the field name and the data type associated with a unique identifier
pub trait UniqueIdentifier: Send + Sync {
    const FIELD: &'static str;
    type DataType: Send + Sync;
}

/// Unit state update interface
pub trait Update: Send + Sync {
    fn update(&mut self) {}
}

/// Pretty prints error message
pub fn print_info<S: Into<String>>(msg: S, e: Option<&dyn std::error::Error>) {
    if let Some(e) = e {
        let mut msg: Vec<String> = vec![msg.into()];
        msg.push(format!("{}", e));
        let mut current = e.source();
        while let Some(cause) = current {
            msg.push(format!("{}", cause));
            current = cause.source();
        }
        warn!("{}", msg.join("\n .due to: "))
    } else {
        info!("{}", msg.into())
    }
}

/// Returns the type name stripped of its module path
pub fn trim_type_name<T>() -> String {
    fn trim(name: &str) -> String {
        if let Some((prefix, suffix)) = name.split_once('<') {
            let generics: Vec<_> = suffix.split(',').map(trim).collect();
            format!("{}<{}", trim(prefix), generics.join(","))
        } else if let Some((_, suffix)) = name.rsplit_once("::") {
            suffix.into()
        } else {
            name.into()
        }
    }
    trim(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Orbit<T>(T);

    #[test]
    fn trimmed_names() {
        assert_eq!(trim_type_name::<Orbit<f64>>(), "Orbit<f64>");
        assert_eq!(trim_type_name::<Silent>(), "Silent");
    }
}
