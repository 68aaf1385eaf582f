use serde_json::Value;

use crate::document::RecordView;
use crate::error::{InputError, Result, ShapeError};
use crate::math::{placement, Isometry3, Rotation3, Vector3};

use super::planes::ZPlanes;
use super::primitive::{
    BoxShape, Cone, Ellipsoid, EllipticalTube, Orb, PhiSection, Polycone, Polyhedra, Primitive,
    Sphere, Torus, Trd, Tube,
};
use super::{BooleanDef, BooleanOp, ComponentDef, ComponentOp, CompositeDef, ShapeDef};

/// Where a shape record sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRole {
    /// A volume record: `position` and `rotation` describe its placement,
    /// and only stand in for the relative transform when no mother is named.
    Volume,
    /// An inline operand or component: `position` and `rotation` may stand in
    /// for `relative_position` and `relative_rotation`.
    Operand,
}

impl ShapeDef {
    /// Reads the shape part of a record.
    ///
    /// Lengths are converted to millimetres and angles to radians. Full
    /// lengths in the document (`size`, `height`, trd `x1`..`y2`) become the
    /// half-lengths the primitives store.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::MissingField`] if `type` is absent,
    /// [`InputError::UnknownShapeType`] for an unsupported type,
    /// [`ShapeError::MissingDimension`] if a required dimension is absent, and
    /// [`InputError::InvalidValue`] for malformed fields.
    pub fn from_record(view: &RecordView<'_>, role: RecordRole) -> Result<Self> {
        let kind = view.str("type")?.ok_or_else(|| InputError::MissingField {
            record: view.label().to_owned(),
            field: "type",
        })?;

        let primitive = match kind.to_ascii_lowercase().as_str() {
            "union" => return boolean(view, BooleanOp::Union, role),
            "subtraction" | "subtract" => return boolean(view, BooleanOp::Subtract, role),
            "intersection" | "intersect" => return boolean(view, BooleanOp::Intersect, role),
            "box" => box_shape(view)?,
            "sphere" => Primitive::Sphere(Sphere {
                rmin: view.length("inner_radius")?.unwrap_or(0.0),
                rmax: required_length(view, "radius")?,
                phi: phi_section(view)?,
                start_theta: view.angle("start_theta")?.unwrap_or(0.0),
                delta_theta: view.angle("delta_theta")?.unwrap_or(std::f64::consts::PI),
            }),
            "orb" => Primitive::Orb(Orb {
                radius: required_length(view, "radius")?,
            }),
            "cylinder" | "tube" | "tubs" => Primitive::Tube(Tube {
                rmin: inner_radius(view)?,
                rmax: required_length(view, "radius")?,
                half_z: required_length(view, "height")? / 2.0,
                phi: phi_section(view)?,
            }),
            "elliptical_tube" => Primitive::EllipticalTube(EllipticalTube {
                dx: required_length(view, "dx")?,
                dy: required_length(view, "dy")?,
                dz: required_length(view, "dz")?,
            }),
            "cone" | "cons" => Primitive::Cone(Cone {
                rmin1: view.length("inner_radius1")?.unwrap_or(0.0),
                rmax1: required_length(view, "radius1")?,
                rmin2: view.length("inner_radius2")?.unwrap_or(0.0),
                rmax2: required_length(view, "radius2")?,
                half_z: required_length(view, "height")? / 2.0,
                phi: phi_section(view)?,
            }),
            "trd" | "trapezoid" => Primitive::Trd(Trd {
                x1: required_length(view, "x1")? / 2.0,
                x2: required_length(view, "x2")? / 2.0,
                y1: required_length(view, "y1")? / 2.0,
                y2: required_length(view, "y2")? / 2.0,
                half_z: required_length(view, "height")? / 2.0,
            }),
            "torus" => Primitive::Torus(Torus {
                rmin: view.length("inner_radius")?.unwrap_or(0.0),
                rmax: required_length(view, "tube_radius")?,
                rtor: required_length(view, "torus_radius")?,
                phi: phi_section(view)?,
            }),
            "ellipsoid" => Primitive::Ellipsoid(Ellipsoid {
                ax: required_length(view, "ax")?,
                by: required_length(view, "by")?,
                cz: required_length(view, "cz")?,
                zcut1: view.length("zcut1")?.unwrap_or(0.0),
                zcut2: view.length("zcut2")?.unwrap_or(0.0),
            }),
            "polycone" => Primitive::Polycone(Polycone {
                phi: phi_section(view)?,
                planes: z_planes(view)?,
            }),
            "polyhedra" => Primitive::Polyhedra(Polyhedra {
                phi: phi_section(view)?,
                num_sides: view.u32("num_sides")?.ok_or_else(|| missing(view, "num_sides"))?,
                planes: z_planes(view)?,
            }),
            _ => {
                return Err(InputError::UnknownShapeType {
                    record: view.label().to_owned(),
                    kind: kind.to_owned(),
                }
                .into())
            }
        };
        Ok(Self::Primitive(primitive))
    }
}

fn missing(view: &RecordView<'_>, field: &'static str) -> crate::error::DetgeomError {
    ShapeError::MissingDimension {
        shape: view.label().to_owned(),
        field,
    }
    .into()
}

fn required_length(view: &RecordView<'_>, field: &'static str) -> Result<f64> {
    view.length(field)?.ok_or_else(|| missing(view, field))
}

fn inner_radius(view: &RecordView<'_>) -> Result<f64> {
    match view.length("inner_radius")? {
        Some(r) => Ok(r),
        None => Ok(view.length("innerRadius")?.unwrap_or(0.0)),
    }
}

fn phi_section(view: &RecordView<'_>) -> Result<PhiSection> {
    let full = PhiSection::FULL;
    Ok(PhiSection {
        start: view.angle("start_phi")?.unwrap_or(full.start),
        delta: view.angle("delta_phi")?.unwrap_or(full.delta),
    })
}

fn box_shape(view: &RecordView<'_>) -> Result<Primitive> {
    let full = match view.vector("size")? {
        Some(size) => size,
        None => {
            if !(view.has("x") || view.has("y") || view.has("z")) {
                return Err(missing(view, "size"));
            }
            Vector3::new(
                required_length(view, "x")?,
                required_length(view, "y")?,
                required_length(view, "z")?,
            )
        }
    };
    Ok(Primitive::Box(BoxShape {
        half_x: full.x / 2.0,
        half_y: full.y / 2.0,
        half_z: full.z / 2.0,
    }))
}

/// Reads `planes: [{z, rmin?, rmax}]` or the parallel `z_planes`, `rmin`, `rmax` arrays.
fn z_planes(view: &RecordView<'_>) -> Result<ZPlanes> {
    if let Some(planes) = view.get("planes") {
        let items = planes
            .as_array()
            .ok_or_else(|| view.invalid("planes", "expected an array of planes"))?;
        let mut z = Vec::with_capacity(items.len());
        let mut rmin = Vec::with_capacity(items.len());
        let mut rmax = Vec::with_capacity(items.len());
        for item in items {
            let plane = view.nested(view.label(), item)?;
            z.push(required_length(&plane, "z")?);
            rmin.push(plane.length("rmin")?.unwrap_or(0.0));
            rmax.push(required_length(&plane, "rmax")?);
        }
        return Ok(ZPlanes::new(z, rmin, rmax));
    }

    let z = view.lengths("z_planes")?.ok_or_else(|| missing(view, "planes"))?;
    let rmax = view.lengths("rmax")?.ok_or_else(|| missing(view, "rmax"))?;
    let rmin = view.lengths("rmin")?.unwrap_or_else(|| vec![0.0; z.len()]);
    Ok(ZPlanes::new(z, rmin, rmax))
}

fn boolean(view: &RecordView<'_>, op: BooleanOp, role: RecordRole) -> Result<ShapeDef> {
    if let Some(components) = view.get("components") {
        return composite(view, components);
    }

    let first = operand(view, "solid1")?;
    let second = operand(view, "solid2")?;
    Ok(ShapeDef::Boolean(Box::new(BooleanDef {
        op,
        first,
        second,
        transform: relative_transform(view, role)?,
    })))
}

/// Reads an operand that is either a shape name or an inline shape record.
fn operand(view: &RecordView<'_>, field: &'static str) -> Result<ShapeDef> {
    let value = view.get(field).ok_or_else(|| missing(view, field))?;
    if let Value::String(reference) = value {
        return Ok(ShapeDef::Reference(reference.clone()));
    }
    let label = format!("{}.{field}", view.label());
    let nested = view.nested(&label, value)?;
    ShapeDef::from_record(&nested, RecordRole::Operand)
}

fn composite(view: &RecordView<'_>, components: &Value) -> Result<ShapeDef> {
    let items = components
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| view.invalid("components", "expected a non-empty array"))?;

    let mut parsed = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let label = format!("{}.components[{i}]", view.label());
        let entry = view.nested(&label, item)?;

        let op = match entry.str("boolean_operation")? {
            None | Some("union" | "add") => ComponentOp::Add,
            Some("subtract" | "subtraction") => ComponentOp::Subtract,
            Some(other) => {
                return Err(entry
                    .invalid("boolean_operation", &format!("unsupported operation `{other}`"))
                    .into())
            }
        };

        let shape = if let Some(reference) = entry.str("ref")? {
            ShapeDef::Reference(reference.to_owned())
        } else if entry.has("solid") {
            operand(&entry, "solid")?
        } else {
            ShapeDef::from_record(&entry, RecordRole::Operand)?
        };

        let transform = relative_transform(&entry, RecordRole::Operand)?;
        if i == 0 && transform != Isometry3::identity() {
            return Err(entry
                .invalid("position", "the first component defines the frame and cannot be moved")
                .into());
        }
        parsed.push(ComponentDef {
            shape,
            op,
            transform,
        });
    }
    Ok(ShapeDef::Composite(CompositeDef { components: parsed }))
}

fn relative_transform(view: &RecordView<'_>, role: RecordRole) -> Result<Isometry3> {
    let fallback = role == RecordRole::Operand || view.mother()?.is_none();
    let position = match view.vector("relative_position")? {
        Some(p) => Some(p),
        None if fallback => view.vector("position")?,
        None => None,
    };
    let rotation = match view.rotation("relative_rotation")? {
        Some(r) => Some(r),
        None if fallback => view.rotation("rotation")?,
        None => None,
    };
    Ok(placement(
        position.unwrap_or_else(Vector3::zeros),
        rotation.unwrap_or_else(Rotation3::identity),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;
    use serde_json::json;

    use super::*;
    use crate::error::DetgeomError;
    use crate::math::{AngleUnit, LengthUnit};

    fn parse(value: &Value) -> Result<ShapeDef> {
        let view = RecordView::new(
            "rec",
            value.as_object().unwrap(),
            LengthUnit::Millimeter,
            AngleUnit::Degree,
        )?;
        ShapeDef::from_record(&view, RecordRole::Volume)
    }

    #[test]
    fn box_size_is_halved_and_scaled() {
        let def = parse(&json!({ "type": "box", "size": { "x": 100, "y": 50, "z": 10, "unit": "cm" } }))
            .unwrap();
        let ShapeDef::Primitive(Primitive::Box(b)) = def else {
            panic!("expected a box");
        };
        assert_relative_eq!(b.half_x, 500.0);
        assert_relative_eq!(b.half_y, 250.0);
        assert_relative_eq!(b.half_z, 50.0);
    }

    #[test]
    fn box_reads_dimensions_object() {
        let def = parse(&json!({ "type": "box", "dimensions": { "x": 2, "y": 4, "z": 6 } })).unwrap();
        assert!(matches!(
            def,
            ShapeDef::Primitive(Primitive::Box(BoxShape { half_x, .. })) if (half_x - 1.0).abs() < 1e-12
        ));
    }

    #[test]
    fn missing_dimension_names_the_field() {
        let err = parse(&json!({ "type": "cylinder", "radius": 5 })).unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Shape(ShapeError::MissingDimension { ref shape, field: "height" }) if shape == "rec"
        ));
    }

    #[test]
    fn tube_accepts_camel_case_inner_radius() {
        let def = parse(&json!({ "type": "tube", "radius": 5, "innerRadius": 2, "height": 10,
                                 "delta_phi": 90 }))
        .unwrap();
        let ShapeDef::Primitive(Primitive::Tube(t)) = def else {
            panic!("expected a tube");
        };
        assert_relative_eq!(t.rmin, 2.0);
        assert_relative_eq!(t.half_z, 5.0);
        assert_relative_eq!(t.phi.delta, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = parse(&json!({ "type": "hyperboloid" })).unwrap_err();
        assert!(matches!(err, DetgeomError::Input(InputError::UnknownShapeType { .. })));
    }

    #[test]
    fn polycone_reads_plane_objects_and_arrays() {
        let from_objects = parse(&json!({ "type": "polycone", "planes": [
            { "z": 0, "rmax": 5 }, { "z": -10, "rmin": 1, "rmax": 4 }
        ] }))
        .unwrap();
        let from_arrays = parse(&json!({ "type": "polycone",
            "z_planes": [0, -10], "rmin": [0, 1], "rmax": [5, 4] }))
        .unwrap();
        assert_eq!(from_objects, from_arrays);
    }

    #[test]
    fn boolean_pair_reads_operands_and_relative_transform() {
        let def = parse(&json!({
            "type": "subtraction",
            "solid1": { "type": "box", "size": { "x": 10, "y": 10, "z": 10 } },
            "solid2": "hole",
            "relative_position": { "x": 1, "y": 2, "z": 3 },
            "position": { "x": 100, "y": 0, "z": 0 }
        }))
        .unwrap();
        let ShapeDef::Boolean(b) = def else {
            panic!("expected a boolean");
        };
        assert_eq!(b.op, BooleanOp::Subtract);
        assert_eq!(b.second, ShapeDef::Reference("hole".into()));
        assert_relative_eq!(b.transform.translation.vector, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn placed_volume_position_is_not_an_operand_offset() {
        let def = parse(&json!({
            "type": "union", "solid1": "a", "solid2": "b", "mother_volume": "World",
            "position": { "x": 100, "y": 0, "z": 0 }
        }))
        .unwrap();
        let ShapeDef::Boolean(b) = def else {
            panic!("expected a boolean");
        };
        assert_eq!(b.transform, Isometry3::identity());
    }

    #[test]
    fn parent_key_also_disables_operand_offset() {
        let def = parse(&json!({
            "type": "union", "solid1": "a", "solid2": "b", "parent": "Box",
            "position": { "x": 100, "y": 0, "z": 0 },
            "rotation": { "x": 0, "y": 0, "z": 90 }
        }))
        .unwrap();
        let ShapeDef::Boolean(b) = def else {
            panic!("expected a boolean");
        };
        assert_eq!(b.transform, Isometry3::identity());
    }

    #[test]
    fn unparented_volume_position_offsets_second_operand() {
        let def = parse(&json!({
            "type": "union", "solid1": "a", "solid2": "b",
            "position": { "x": 100, "y": 0, "z": 0 }
        }))
        .unwrap();
        let ShapeDef::Boolean(b) = def else {
            panic!("expected a boolean");
        };
        assert_relative_eq!(b.transform.translation.vector, Vector3::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn components_keep_declared_operations() {
        let def = parse(&json!({
            "type": "union",
            "components": [
                { "ref": "base" },
                { "boolean_operation": "subtract", "type": "orb", "radius": 1,
                  "position": { "x": 5, "y": 0, "z": 0 } },
                { "boolean_operation": "union", "solid": "fin" }
            ]
        }))
        .unwrap();
        let ShapeDef::Composite(c) = def else {
            panic!("expected a composite");
        };
        let ops: Vec<_> = c.components.iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![ComponentOp::Add, ComponentOp::Subtract, ComponentOp::Add]);
        assert_eq!(c.components[2].shape, ShapeDef::Reference("fin".into()));
    }

    #[test]
    fn moving_the_first_component_is_rejected() {
        let err = parse(&json!({
            "type": "union",
            "components": [ { "ref": "base", "position": { "x": 1 } }, { "ref": "other" } ]
        }))
        .unwrap_err();
        assert!(matches!(err, DetgeomError::Input(InputError::InvalidValue { .. })));
    }
}
