use serde_json::map::Map;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::mseed_error::MSeedError;
use crate::record::MSeed3Record;

pub const FDSN_EXTRA_HEADERS: &str = "FDSN";

/// The free-form extra header tree of a record, a JSON object addressed
/// by RFC 6901 JSON pointers. Key order is preserved so repeated
/// parse/serialize cycles are byte stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtraHeaders {
    pub root: Map<String, Value>,
}

impl ExtraHeaders {
    pub fn new() -> ExtraHeaders {
        ExtraHeaders {
            root: Map::new(),
        }
    }

    /// An empty tree serializes to nothing in a record.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Minimal UTF-8 JSON encoding, no added whitespace.
    pub fn to_json(&self) -> Result<String, MSeedError> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// Byte length of the serialized tree, 0 when empty.
    pub fn byte_len(&self) -> Result<u16, MSeedError> {
        if self.is_empty() {
            return Ok(0);
        }
        Ok(self.to_json()?.len() as u16)
    }

    /// Resolve a pointer, None when the path does not exist. The empty
    /// pointer resolves to the whole tree.
    pub fn get(&self, pointer: &str) -> Option<Value> {
        let tokens = match parse_pointer(pointer) {
            Ok(t) => t,
            Err(_) => return None,
        };
        if tokens.is_empty() {
            return Some(Value::Object(self.root.clone()));
        }
        let mut current = self.root.get(&tokens[0])?;
        for token in &tokens[1..] {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(arr) => arr.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Insert or replace the value at the pointer, creating intermediate
    /// objects along the way. An intermediate that exists but is not a
    /// container fails with PathConflict. A pointer of `` or `/`
    /// replaces the whole tree, in which case the value must be an
    /// object.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<(), MSeedError> {
        if pointer.is_empty() || pointer == "/" {
            match value {
                Value::Object(map) => {
                    self.root = map;
                    return Ok(());
                }
                other => return Err(MSeedError::ExtraHeaderNotObject(other)),
            }
        }
        let tokens = parse_pointer(pointer)?;
        let (last, parents) = match tokens.split_last() {
            Some(split) => split,
            None => return Err(MSeedError::EhPointer(pointer.to_string())),
        };

        if parents.is_empty() {
            self.root.insert(last.clone(), value);
            return Ok(());
        }

        // walk down to the parent container, creating objects as needed
        let mut walked = format!("/{}", parents[0]);
        let entry = self
            .root
            .entry(parents[0].clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !matches!(entry, Value::Object(_) | Value::Array(_)) {
            return Err(MSeedError::PathConflict(pointer.to_string(), walked));
        }
        let mut current = entry;
        for token in &parents[1..] {
            current = descend_or_create(current, token, pointer, &walked)?;
            walked.push('/');
            walked.push_str(token);
        }
        match current {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(arr) => set_array_element(arr, last, value, pointer),
            _ => Err(MSeedError::PathConflict(pointer.to_string(), walked)),
        }
    }

    /// Remove and return the value at the pointer.
    pub fn delete(&mut self, pointer: &str) -> Result<Value, MSeedError> {
        let tokens = parse_pointer(pointer)?;
        let (last, parents) = match tokens.split_last() {
            Some(split) => split,
            None => return Err(MSeedError::EhPointer(pointer.to_string())),
        };
        if parents.is_empty() {
            return self
                .root
                .remove(last)
                .ok_or_else(|| MSeedError::EhPointerNotFound(pointer.to_string()));
        }
        let mut current = self
            .root
            .get_mut(&parents[0])
            .ok_or_else(|| MSeedError::EhPointerNotFound(pointer.to_string()))?;
        for token in &parents[1..] {
            current = match current {
                Value::Object(map) => map.get_mut(token),
                Value::Array(arr) => match token.parse::<usize>() {
                    Ok(idx) => arr.get_mut(idx),
                    Err(_) => None,
                },
                _ => None,
            }
            .ok_or_else(|| MSeedError::EhPointerNotFound(pointer.to_string()))?;
        }
        match current {
            Value::Object(map) => map
                .remove(last)
                .ok_or_else(|| MSeedError::EhPointerNotFound(pointer.to_string())),
            Value::Array(arr) => match last.parse::<usize>() {
                Ok(idx) if idx < arr.len() => Ok(arr.remove(idx)),
                _ => Err(MSeedError::EhPointerNotFound(pointer.to_string())),
            },
            _ => Err(MSeedError::EhPointerNotFound(pointer.to_string())),
        }
    }

    /// The mutable FDSN reserved sub-object, created if absent.
    pub fn create_fdsn_headers(&mut self) -> Result<&mut Map<String, Value>, MSeedError> {
        if !self.root.contains_key(FDSN_EXTRA_HEADERS) {
            self.root.insert(
                FDSN_EXTRA_HEADERS.to_string(),
                Value::Object(Map::new()),
            );
        }
        match self.root.get_mut(FDSN_EXTRA_HEADERS) {
            Some(Value::Object(fdsn_obj)) => Ok(fdsn_obj),
            _ => Err(MSeedError::ExtraHeaderParse(String::from(
                "value for key=FDSN is not object in json",
            ))),
        }
    }

    /// Make sure that if FDSN is in extra headers, its value is a json object.
    pub fn validate(&self) -> Result<(), MSeedError> {
        match self.root.get(FDSN_EXTRA_HEADERS) {
            Some(fdsn_obj) => match fdsn_obj.as_object() {
                Some(_) => Ok(()),
                None => Err(MSeedError::ExtraHeaderParse(String::from(
                    "value for key=FDSN is not object in json",
                ))),
            },
            None => Ok(()),
        }
    }
}

fn descend_or_create<'a>(
    current: &'a mut Value,
    token: &str,
    pointer: &str,
    walked: &str,
) -> Result<&'a mut Value, MSeedError> {
    match current {
        Value::Object(map) => {
            let entry = map
                .entry(token.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(_) | Value::Array(_) => Ok(entry),
                _ => Err(MSeedError::PathConflict(
                    pointer.to_string(),
                    format!("{}/{}", walked, token),
                )),
            }
        }
        Value::Array(arr) => {
            let idx = token
                .parse::<usize>()
                .map_err(|_| MSeedError::EhPointer(pointer.to_string()))?;
            arr.get_mut(idx)
                .ok_or_else(|| MSeedError::EhPointerNotFound(pointer.to_string()))
        }
        _ => Err(MSeedError::PathConflict(
            pointer.to_string(),
            walked.to_string(),
        )),
    }
}

fn set_array_element(
    arr: &mut Vec<Value>,
    token: &str,
    value: Value,
    pointer: &str,
) -> Result<(), MSeedError> {
    if token == "-" {
        arr.push(value);
        return Ok(());
    }
    let idx = token
        .parse::<usize>()
        .map_err(|_| MSeedError::EhPointer(pointer.to_string()))?;
    if idx < arr.len() {
        arr[idx] = value;
        Ok(())
    } else if idx == arr.len() {
        arr.push(value);
        Ok(())
    } else {
        Err(MSeedError::EhPointerNotFound(pointer.to_string()))
    }
}

/// Split a pointer into unescaped reference tokens. The empty pointer
/// yields no tokens; anything else must begin with `/`.
fn parse_pointer(pointer: &str) -> Result<Vec<String>, MSeedError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    if !pointer.starts_with('/') {
        return Err(MSeedError::EhPointer(pointer.to_string()));
    }
    Ok(pointer
        .split('/')
        .skip(1)
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Resolve the pointer against every record's extra headers. A missing
/// path reports None for that record, iteration never aborts.
pub fn get_all(records: &[MSeed3Record], pointer: &str) -> Vec<Option<Value>> {
    records
        .iter()
        .map(|rec| rec.extra_headers.get(pointer))
        .collect()
}

/// Set the pointer in every record's extra headers.
pub fn set_all(
    records: &mut [MSeed3Record],
    pointer: &str,
    value: &Value,
) -> Result<(), MSeedError> {
    for rec in records.iter_mut() {
        rec.extra_headers.set(pointer, value.clone())?;
    }
    Ok(())
}

/// Delete the pointer from every record that has it, returning how many
/// records contained the path.
pub fn delete_all(records: &mut [MSeed3Record], pointer: &str) -> usize {
    let mut count = 0;
    for rec in records.iter_mut() {
        if rec.extra_headers.delete(pointer).is_ok() {
            count += 1;
        }
    }
    count
}

impl From<Map<String, Value>> for ExtraHeaders {
    fn from(m: Map<String, Value>) -> Self {
        ExtraHeaders { root: m }
    }
}

impl FromStr for ExtraHeaders {
    type Err = MSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ExtraHeaders {
            root: parse_to_map(s)?,
        })
    }
}

pub fn parse_to_map(s: &str) -> Result<Map<String, Value>, MSeedError> {
    let v: Value = serde_json::from_str(s)?;
    match v {
        Value::Object(map) => Ok(map),
        _ => Err(MSeedError::ExtraHeaderNotObject(v)),
    }
}

impl fmt::Display for ExtraHeaders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_json() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{{}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"FDSN":{"Time":{"Quality":0}}}"#.parse()?;
        eh.set("/data", json!({"key": "val", "keyb": 3}))?;
        assert_eq!(eh.get("/data/keyb"), Some(json!(3)));
        eh.set("/data/keyb", json!(42))?;
        assert_eq!(eh.get("/data"), Some(json!({"key": "val", "keyb": 42})));
        assert_eq!(eh.get("/FDSN/Time/Quality"), Some(json!(0)));
        Ok(())
    }

    #[test]
    fn get_missing_is_none() -> Result<(), MSeedError> {
        let eh: ExtraHeaders = r#"{"a":{"b":1}}"#.parse()?;
        assert_eq!(eh.get("/a/c"), None);
        assert_eq!(eh.get("/nope"), None);
        assert_eq!(eh.get("/a/b/c"), None);
        Ok(())
    }

    #[test]
    fn set_creates_intermediates() -> Result<(), MSeedError> {
        let mut eh = ExtraHeaders::new();
        eh.set("/a/b/c", json!(7))?;
        assert_eq!(eh.get("/a/b/c"), Some(json!(7)));
        assert_eq!(eh.get("/a"), Some(json!({"b": {"c": 7}})));
        Ok(())
    }

    #[test]
    fn set_through_scalar_conflicts() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"a":{"b":1}}"#.parse()?;
        assert!(matches!(
            eh.set("/a/b/c", json!(2)),
            Err(MSeedError::PathConflict(_, _))
        ));
        Ok(())
    }

    #[test]
    fn delete_then_get() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"a":{"b":1,"c":2}}"#.parse()?;
        assert_eq!(eh.delete("/a/b")?, json!(1));
        assert_eq!(eh.get("/a/b"), None);
        assert!(matches!(
            eh.delete("/a/b"),
            Err(MSeedError::EhPointerNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn array_addressing() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"arr":[1,2,3]}"#.parse()?;
        assert_eq!(eh.get("/arr/1"), Some(json!(2)));
        eh.set("/arr/1", json!(20))?;
        assert_eq!(eh.get("/arr"), Some(json!([1, 20, 3])));
        eh.set("/arr/-", json!(4))?;
        assert_eq!(eh.get("/arr/3"), Some(json!(4)));
        assert_eq!(eh.delete("/arr/0")?, json!(1));
        Ok(())
    }

    #[test]
    fn escaped_tokens() -> Result<(), MSeedError> {
        let mut eh = ExtraHeaders::new();
        eh.set("/a~1b/m~0n", json!(1))?;
        assert_eq!(eh.get("/a~1b/m~0n"), Some(json!(1)));
        let whole = eh.get("").unwrap();
        assert_eq!(whole, json!({"a/b": {"m~n": 1}}));
        Ok(())
    }

    #[test]
    fn replace_whole_tree() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"old":1}"#.parse()?;
        eh.set("", json!({"new": 2}))?;
        assert_eq!(eh.get("/new"), Some(json!(2)));
        assert_eq!(eh.get("/old"), None);
        assert!(eh.set("", json!(5)).is_err());
        Ok(())
    }

    #[test]
    fn pointer_without_slash_rejected() {
        let mut eh = ExtraHeaders::new();
        assert!(matches!(
            eh.set("ab", json!(1)),
            Err(MSeedError::EhPointer(_))
        ));
    }

    #[test]
    fn serialization_is_minimal_and_stable() -> Result<(), MSeedError> {
        let mut eh: ExtraHeaders = r#"{"FDSN":{"Time":{"Quality":80}},"z":1,"a":2}"#.parse()?;
        let first = eh.to_json()?;
        assert!(!first.contains(' '));
        // key order survives a get/set cycle
        eh.set("/z", json!(1))?;
        assert_eq!(eh.to_json()?, first);
        Ok(())
    }

    #[test]
    fn fdsn_headers_created_once() -> Result<(), MSeedError> {
        let mut eh = ExtraHeaders::new();
        eh.create_fdsn_headers()?
            .insert(String::from("DataQuality"), json!("Q"));
        eh.create_fdsn_headers()?; // second call keeps contents
        assert_eq!(eh.get("/FDSN/DataQuality"), Some(json!("Q")));
        eh.validate()?;
        Ok(())
    }
}
