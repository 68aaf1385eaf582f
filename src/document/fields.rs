use serde_json::{Map, Value};

use crate::error::InputError;
use crate::math::{euler_rotation, AngleUnit, LengthUnit, Rotation3, Vector3};

/// Typed, unit-aware read access to the fields of one JSON record.
///
/// Lookups check the record itself first and then its `dimensions` object.
/// Plain numbers are interpreted in the view's length or angle unit, which
/// the record may override with `unit` and `angle_unit`; a quantity can also
/// carry its own unit as `{ "value": 10, "unit": "cm" }`.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    label: &'a str,
    fields: &'a Map<String, Value>,
    dimensions: Option<&'a Map<String, Value>>,
    length_unit: LengthUnit,
    angle_unit: AngleUnit,
}

impl<'a> RecordView<'a> {
    /// Creates a view over a record, applying its unit overrides to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the record names an unknown unit.
    pub fn new(
        label: &'a str,
        fields: &'a Map<String, Value>,
        length_unit: LengthUnit,
        angle_unit: AngleUnit,
    ) -> Result<Self, InputError> {
        let dimensions = fields.get("dimensions").and_then(Value::as_object);
        let mut view = Self {
            label,
            fields,
            dimensions,
            length_unit,
            angle_unit,
        };
        if let Some(unit) = view.unit_override("unit")? {
            view.length_unit = unit.parse()?;
        }
        if let Some(unit) = view.unit_override("angle_unit")? {
            view.angle_unit = unit.parse()?;
        }
        Ok(view)
    }

    /// Creates a view over a nested object, inheriting this view's units.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object or names an unknown unit.
    pub fn nested<'b>(
        &self,
        label: &'b str,
        value: &'b Value,
    ) -> Result<RecordView<'b>, InputError>
    where
        'a: 'b,
    {
        let fields = value
            .as_object()
            .ok_or_else(|| self.invalid(label, "expected an object"))?;
        RecordView::new(label, fields, self.length_unit, self.angle_unit)
    }

    /// Returns the label used in diagnostics for this record.
    #[must_use]
    pub fn label(&self) -> &'a str {
        self.label
    }

    /// Returns the length unit plain numbers are read in.
    #[must_use]
    pub fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }

    /// Returns the angle unit plain numbers are read in.
    #[must_use]
    pub fn angle_unit(&self) -> AngleUnit {
        self.angle_unit
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields
            .get(key)
            .or_else(|| self.dimensions.and_then(|dims| dims.get(key)))
            .filter(|value| !value.is_null())
    }

    /// Returns `true` if the field is present and not null.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Reads the mother volume a record names, from `mother_volume` or else
    /// `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but not a string.
    pub fn mother(&self) -> Result<Option<&'a str>, InputError> {
        match self.str("mother_volume")? {
            Some(mother) => Ok(Some(mother)),
            None => self.str("parent"),
        }
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but not a string.
    pub fn str(&self, key: &str) -> Result<Option<&'a str>, InputError> {
        self.get(key)
            .map(|value| value.as_str().ok_or_else(|| self.invalid(key, "expected a string")))
            .transpose()
    }

    /// Reads a boolean field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but not a boolean.
    pub fn bool(&self, key: &str) -> Result<Option<bool>, InputError> {
        self.get(key)
            .map(|value| value.as_bool().ok_or_else(|| self.invalid(key, "expected a boolean")))
            .transpose()
    }

    /// Reads a non-negative integer field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but not a non-negative integer
    /// that fits in 32 bits.
    pub fn u32(&self, key: &str) -> Result<Option<u32>, InputError> {
        self.get(key)
            .map(|value| {
                value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| self.invalid(key, "expected a non-negative integer"))
            })
            .transpose()
    }

    /// Reads a plain number without unit conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but not a number.
    pub fn number(&self, key: &str) -> Result<Option<f64>, InputError> {
        self.get(key)
            .map(|value| value.as_f64().ok_or_else(|| self.invalid(key, "expected a number")))
            .transpose()
    }

    /// Reads a length, converted to millimetres.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a number or quantity object, or
    /// names an unknown unit.
    pub fn length(&self, key: &str) -> Result<Option<f64>, InputError> {
        self.get(key)
            .map(|value| self.quantity(key, value, length_scale, self.length_unit.to_mm()))
            .transpose()
    }

    /// Reads an angle, converted to radians.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a number or quantity object, or
    /// names an unknown unit.
    pub fn angle(&self, key: &str) -> Result<Option<f64>, InputError> {
        self.get(key)
            .map(|value| self.quantity(key, value, angle_scale, self.angle_unit.to_rad()))
            .transpose()
    }

    /// Reads an array of lengths, converted to millimetres.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not an array of numbers or quantities.
    pub fn lengths(&self, key: &str) -> Result<Option<Vec<f64>>, InputError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value.as_array().ok_or_else(|| self.invalid(key, "expected an array"))?;
        items
            .iter()
            .map(|item| self.quantity(key, item, length_scale, self.length_unit.to_mm()))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Reads a position-like vector `{x, y, z, unit?}` or `[x, y, z]`, in millimetres.
    ///
    /// Missing components default to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the field has the wrong shape or names an unknown unit.
    pub fn vector(&self, key: &str) -> Result<Option<Vector3>, InputError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let [x, y, z] = self.triple(key, value, length_scale, self.length_unit.to_mm())?;
        Ok(Some(Vector3::new(x, y, z)))
    }

    /// Reads a rotation `{x, y, z, unit?}` or `[x, y, z]` of angles about the
    /// X, Y and Z axes, applied in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the field has the wrong shape or names an unknown unit.
    pub fn rotation(&self, key: &str) -> Result<Option<Rotation3>, InputError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let [rx, ry, rz] = self.triple(key, value, angle_scale, self.angle_unit.to_rad())?;
        Ok(Some(euler_rotation(rx, ry, rz)))
    }

    /// Builds an [`InputError::InvalidValue`] for a field of this record.
    #[must_use]
    pub fn invalid(&self, field: &str, reason: &str) -> InputError {
        InputError::InvalidValue {
            record: self.label.to_owned(),
            field: field.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn unit_override(&self, key: &str) -> Result<Option<&'a str>, InputError> {
        let value = self
            .fields
            .get(key)
            .or_else(|| self.dimensions.and_then(|dims| dims.get(key)));
        value
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().ok_or_else(|| self.invalid(key, "expected a unit string")))
            .transpose()
    }

    fn quantity(
        &self,
        key: &str,
        value: &Value,
        scale_of: fn(&str) -> Result<f64, InputError>,
        default_scale: f64,
    ) -> Result<f64, InputError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(|v| v * default_scale)
                .ok_or_else(|| self.invalid(key, "number out of range")),
            Value::Object(obj) => {
                let v = obj
                    .get("value")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| self.invalid(key, "quantity needs a numeric `value`"))?;
                let scale = match obj.get("unit").and_then(Value::as_str) {
                    Some(unit) => scale_of(unit)?,
                    None => default_scale,
                };
                Ok(v * scale)
            }
            _ => Err(self.invalid(key, "expected a number or {value, unit}")),
        }
    }

    fn triple(
        &self,
        key: &str,
        value: &Value,
        scale_of: fn(&str) -> Result<f64, InputError>,
        default_scale: f64,
    ) -> Result<[f64; 3], InputError> {
        match value {
            Value::Object(obj) => {
                let scale = match obj.get("unit").and_then(Value::as_str) {
                    Some(unit) => scale_of(unit)?,
                    None => default_scale,
                };
                let mut out = [0.0; 3];
                for (slot, axis) in out.iter_mut().zip(["x", "y", "z"]) {
                    if let Some(component) = obj.get(axis) {
                        *slot = component
                            .as_f64()
                            .ok_or_else(|| self.invalid(key, "vector components must be numbers"))?
                            * scale;
                    }
                }
                Ok(out)
            }
            Value::Array(items) if items.len() == 3 => {
                let mut out = [0.0; 3];
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = item
                        .as_f64()
                        .ok_or_else(|| self.invalid(key, "vector components must be numbers"))?
                        * default_scale;
                }
                Ok(out)
            }
            _ => Err(self.invalid(key, "expected {x, y, z} or a three-element array")),
        }
    }
}

fn length_scale(unit: &str) -> Result<f64, InputError> {
    Ok(unit.parse::<LengthUnit>()?.to_mm())
}

fn angle_scale(unit: &str) -> Result<f64, InputError> {
    Ok(unit.parse::<AngleUnit>()?.to_rad())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn view(value: &Value) -> RecordView<'_> {
        let fields = value.as_object().unwrap();
        RecordView::new("test", fields, LengthUnit::Millimeter, AngleUnit::Degree).unwrap()
    }

    #[test]
    fn mother_prefers_mother_volume_over_parent() {
        let value = json!({ "mother_volume": "Cryostat", "parent": "World" });
        assert_eq!(view(&value).mother().unwrap(), Some("Cryostat"));
        let value = json!({ "parent": "Box" });
        assert_eq!(view(&value).mother().unwrap(), Some("Box"));
        assert_eq!(view(&json!({})).mother().unwrap(), None);
    }

    #[test]
    fn record_unit_overrides_default() {
        let value = json!({ "unit": "cm", "radius": 2.5 });
        assert_relative_eq!(view(&value).length("radius").unwrap().unwrap(), 25.0);
    }

    #[test]
    fn quantity_object_carries_its_own_unit() {
        let value = json!({ "radius": { "value": 1, "unit": "m" } });
        assert_relative_eq!(view(&value).length("radius").unwrap().unwrap(), 1000.0);
    }

    #[test]
    fn dimensions_object_is_searched() {
        let value = json!({ "dimensions": { "x": 10, "unit": "cm" } });
        let v = view(&value);
        assert_relative_eq!(v.length("x").unwrap().unwrap(), 100.0);
        assert!(v.length("y").unwrap().is_none());
    }

    #[test]
    fn vector_defaults_missing_components() {
        let value = json!({ "position": { "x": 1, "unit": "cm" } });
        let pos = view(&value).vector("position").unwrap().unwrap();
        assert_relative_eq!(pos, Vector3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn wrong_type_is_reported_with_field() {
        let value = json!({ "radius": "big" });
        let err = view(&value).length("radius").unwrap_err();
        assert!(matches!(err, InputError::InvalidValue { ref field, .. } if field == "radius"));
    }

    #[test]
    fn rotation_reads_degrees_by_default() {
        let value = json!({ "rotation": { "x": 0, "y": 0, "z": 90 } });
        let rot = view(&value).rotation("rotation").unwrap().unwrap();
        assert_relative_eq!(rot * Vector3::x(), Vector3::y(), epsilon = 1e-12);
    }
}
