//! Durable encoding of step outputs and their replay as compensation arguments.
//!
//! A forward function returns a tuple of values. The coordinator encodes the
//! tuple as a JSON array, one element per position, and stores it in the
//! step's `SagaStepExec` log entry. When the step has to be compensated the
//! array is decoded against the compensation's parameter tuple. Decoding only
//! ever reads the log, never the values the forward call returned in memory,
//! so a run can be compensated after the process that started it is gone.
//!
//! `null` or missing elements decode to the parameter type's [`Default`]
//! value, which is why compensation parameters must implement it.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::PayloadError;
use crate::signature::{Signature, TypeSlot};

/// The non-error values a forward function returns.
///
/// Implemented for tuples of up to eight [`Serialize`] values, including `()`.
pub trait StepOutput: Send + 'static {
    /// The types of the values, in order.
    fn signature() -> Signature;

    /// Encodes the values as a JSON array.
    fn encode(&self) -> Result<Value, PayloadError>;
}

/// The parameters a compensation takes after its context.
///
/// Implemented for tuples of up to eight values that are [`DeserializeOwned`]
/// and [`Default`], including `()`.
pub trait CompensateArgs: Sized + Send + 'static {
    /// The types of the parameters, in order.
    fn signature() -> Signature;

    /// Rebuilds the parameters from a logged JSON array.
    fn decode(payload: &Value) -> Result<Self, PayloadError>;
}

fn encode_value<T: Serialize>(value: &T, index: usize) -> Result<Value, PayloadError> {
    serde_json::to_value(value).map_err(|source| PayloadError::Encode {
        position: index + 1,
        type_name: std::any::type_name::<T>(),
        source,
    })
}

fn decode_value<T: DeserializeOwned + Default>(
    values: &[Value],
    index: usize,
) -> Result<T, PayloadError> {
    match values.get(index) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            <T as serde::Deserialize>::deserialize(value).map_err(|source| PayloadError::Decode {
                position: index + 1,
                type_name: std::any::type_name::<T>(),
                source,
            })
        }
    }
}

fn as_array(payload: &Value) -> Result<&[Value], PayloadError> {
    match payload {
        Value::Array(values) => Ok(values),
        Value::Null => Ok(&[]),
        Value::Bool(_) => Err(PayloadError::NotAnArray("boolean")),
        Value::Number(_) => Err(PayloadError::NotAnArray("number")),
        Value::String(_) => Err(PayloadError::NotAnArray("string")),
        Value::Object(_) => Err(PayloadError::NotAnArray("object")),
    }
}

macro_rules! impl_tuple {
    ($($T:ident => $idx:tt),*) => {
        impl<$($T),*> StepOutput for ($($T,)*)
        where
            $($T: Serialize + Send + 'static,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(TypeSlot::of::<$T>()),*])
            }

            fn encode(&self) -> Result<Value, PayloadError> {
                Ok(Value::Array(vec![$(encode_value(&self.$idx, $idx)?),*]))
            }
        }

        impl<$($T),*> CompensateArgs for ($($T,)*)
        where
            $($T: DeserializeOwned + Default + Send + 'static,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(TypeSlot::of::<$T>()),*])
            }

            #[allow(unused_variables)]
            fn decode(payload: &Value) -> Result<Self, PayloadError> {
                let values = as_array(payload)?;
                Ok(($(decode_value::<$T>(values, $idx)?,)*))
            }
        }
    };
}

impl_tuple!();
impl_tuple!(A => 0);
impl_tuple!(A => 0, B => 1);
impl_tuple!(A => 0, B => 1, C => 2);
impl_tuple!(A => 0, B => 1, C => 2, D => 3);
impl_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Transfer {
        id: String,
        from: String,
        to: String,
        amount: i64,
    }

    #[test]
    fn struct_primitive_and_empty_list_survive_the_log() {
        let transfer = Transfer {
            id: "t-1".to_string(),
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 10,
        };
        let outputs = (transfer.clone(), 42_u32, Option::<Vec<String>>::None);

        let payload = outputs.encode().unwrap();
        assert_eq!(payload[1], json!(42));
        assert_eq!(payload[2], Value::Null);

        let (t, n, list): (Transfer, u32, Option<Vec<String>>) =
            CompensateArgs::decode(&payload).unwrap();
        assert_eq!(t, transfer);
        assert_eq!(n, 42);
        assert_eq!(list, None);
    }

    #[test]
    fn null_decodes_to_the_zero_value() {
        let payload = json!([null, null, null]);
        let (s, n, v): (String, i64, Vec<u8>) = CompensateArgs::decode(&payload).unwrap();
        assert_eq!(s, "");
        assert_eq!(n, 0);
        assert!(v.is_empty());
    }

    #[test]
    fn missing_elements_decode_to_the_zero_value() {
        let (a, b): (i32, String) = CompensateArgs::decode(&json!([7])).unwrap();
        assert_eq!(a, 7);
        assert_eq!(b, "");

        let (c,): (Transfer,) = CompensateArgs::decode(&Value::Null).unwrap();
        assert_eq!(c, Transfer::default());
    }

    #[test]
    fn unit_round_trips_as_empty_array() {
        assert_eq!(().encode().unwrap(), json!([]));
        <() as CompensateArgs>::decode(&json!([])).unwrap();
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let err = <(i32,) as CompensateArgs>::decode(&json!(["not a number"])).unwrap_err();
        assert!(matches!(err, PayloadError::Decode { position: 1, .. }));

        let err = <(i32,) as CompensateArgs>::decode(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err, PayloadError::NotAnArray("object")));
    }

    #[test]
    fn output_and_argument_signatures_agree_for_the_same_tuple() {
        assert_eq!(
            <(Transfer, u32) as StepOutput>::signature(),
            <(Transfer, u32) as CompensateArgs>::signature()
        );
        assert_ne!(
            <(Transfer, u32) as StepOutput>::signature(),
            <(u32, Transfer) as CompensateArgs>::signature()
        );
    }
}
