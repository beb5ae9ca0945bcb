use num_traits::Float;
use serde::Serializer;

/// Decimal places kept for rates and thicknesses in reports.
pub const REPORT_DIGITS: usize = 5;

fn limit<T: Float>(x: T) -> Option<f64> {
    let x = x.to_f64()?;
    if x.is_finite() {
        format!("{:.*}", REPORT_DIGITS, x).parse().ok()
    } else {
        None
    }
}

pub fn serialize_float_5dgt<T: Float, S>(x: &T, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match limit(*x) {
        Some(v) => s.serialize_f64(v),
        None => s.serialize_none(),
    }
}

pub fn serialize_option_float_5dgt<T: Float, S>(x: &Option<T>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match x.and_then(limit) {
        Some(v) => s.serialize_f64(v),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(serde::Serialize)]
    struct Row {
        #[serde(serialize_with = "serialize_float_5dgt")]
        a: f32,
        #[serde(serialize_with = "serialize_option_float_5dgt")]
        b: Option<f64>,
        #[serde(serialize_with = "serialize_option_float_5dgt")]
        c: Option<f64>,
    }

    #[test]
    fn limited() {
        let row = Row {
            a: 0.012,
            b: Some(0.0107462686),
            c: None,
        };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"a":0.012,"b":0.01075,"c":null}"#);
        let row = Row {
            a: f32::INFINITY,
            b: Some(f64::NAN),
            c: Some(2.0),
        };
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"a":null,"b":null,"c":2.0}"#);
    }
}
