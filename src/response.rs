//! Response decoding.
//!
//! Every exchange ends in one of three outcomes: a typed success value, an [`ApiError`]
//! carrying the remote's field bag, or a [`Malformed`] body. Callers branch on
//! [`Kind`](crate::error::Kind), so the split must stay exact.
//!
//! [`ApiError`]: crate::error::ApiError
//! [`Malformed`]: crate::error::Malformed

use std::collections::BTreeMap;
use std::fmt;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;
use crate::error::Error;

/// Open-ended field/message bag returned in `>= 400` bodies.
///
/// Keys are kept sorted so the rendered message is stable.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, serde_json::Value>);

impl ErrorMap {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Error returned from API: ")?;
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Reads the whole body and decodes it. A failure to read the body is a transport error.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    decode_body(status, &body)
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if status.as_u16() >= 400 {
        return match from_json::<ErrorMap>(body) {
            Ok(fields) => Err(Error::api(status, fields)),
            Err(e) => Err(Error::malformed(status, body, e)),
        };
    }

    from_json(body).map_err(|e| Error::malformed(status, body, e))
}

fn from_json<T: DeserializeOwned>(
    body: &str,
) -> std::result::Result<T, serde_path_to_error::Error<serde_json::Error>> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de)
}

/// Treats both `null` and `""` as absent. The API uses either for "no next page" and
/// "not cancellable".
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
