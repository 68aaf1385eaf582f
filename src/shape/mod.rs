//! CSG shape descriptions and the memoizing shape builder.
//!
//! A [`ShapeDef`] is the declarative form read from a document; the
//! [`ShapeBuilder`] turns it into [`ShapeData`] entries of a
//! [`GeometryStore`](crate::store::GeometryStore). Boolean shapes reference
//! their operands by [`ShapeId`], so operands can be shared between
//! expressions without being copied.

mod builder;
mod extent;
mod parse;
mod planes;
mod primitive;

pub use builder::ShapeBuilder;
pub use extent::Aabb;
pub use parse::RecordRole;
pub use planes::ZPlanes;
pub use primitive::{
    BoxShape, Cone, Ellipsoid, EllipticalTube, Orb, PhiSection, Polycone, Polyhedra, Primitive,
    Sphere, Torus, Trd, Tube,
};

use crate::math::Isometry3;

slotmap::new_key_type! {
    /// Unique identifier for a shape in the geometry store.
    pub struct ShapeId;
}

/// The boolean operation combining two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

/// A built solid.
#[derive(Debug, Clone, PartialEq)]
pub enum Solid {
    Primitive(Primitive),
    Boolean(BooleanSolid),
}

/// Two built shapes combined by a boolean operation.
///
/// `transform` places the second operand in the frame of the first.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanSolid {
    pub op: BooleanOp,
    pub first: ShapeId,
    pub second: ShapeId,
    pub transform: Isometry3,
}

/// A named shape owned by the geometry store.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeData {
    pub name: String,
    pub solid: Solid,
    /// Conservative bounding box in the shape's own frame.
    pub extent: Aabb,
}

/// Declarative description of a shape, before it is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDef {
    Primitive(Primitive),
    /// The name of a shape that must already be built.
    Reference(String),
    Boolean(Box<BooleanDef>),
    Composite(CompositeDef),
}

/// A boolean of exactly two operands.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanDef {
    pub op: BooleanOp,
    pub first: ShapeDef,
    pub second: ShapeDef,
    /// Placement of the second operand in the frame of the first.
    pub transform: Isometry3,
}

/// Whether a component is added to or removed from a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOp {
    Add,
    Subtract,
}

/// One entry of a composite shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDef {
    pub shape: ShapeDef,
    pub op: ComponentOp,
    /// Placement relative to the first component.
    pub transform: Isometry3,
}

/// A shape built from an ordered list of components.
///
/// The first component is the base. Every other `Add` component is unioned in
/// first, in list order, and only then is every `Subtract` component removed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDef {
    pub components: Vec<ComponentDef>,
}

impl ShapeDef {
    /// Rewrites every shape reference in the definition, operands included.
    pub fn rename_references(&mut self, rename: &dyn Fn(&str) -> String) {
        match self {
            Self::Primitive(_) => {}
            Self::Reference(name) => *name = rename(name),
            Self::Boolean(boolean) => {
                boolean.first.rename_references(rename);
                boolean.second.rename_references(rename);
            }
            Self::Composite(composite) => {
                for component in &mut composite.components {
                    component.shape.rename_references(rename);
                }
            }
        }
    }
}
