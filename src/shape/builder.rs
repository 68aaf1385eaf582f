use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, ShapeError};
use crate::math::Isometry3;
use crate::report::{BuildWarning, Warnings};
use crate::store::GeometryStore;

use super::{
    BooleanOp, BooleanSolid, ComponentOp, CompositeDef, ShapeData, ShapeDef, ShapeId, Solid,
};

/// Builds shapes into a [`GeometryStore`], memoized by name.
///
/// Names currently under construction are tracked so that a shape reaching
/// itself through references is reported as
/// [`ShapeError::CyclicShapeReference`] rather than recursing forever.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    built: HashMap<String, ShapeId>,
    in_progress: Vec<String>,
}

impl ShapeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of an already built shape.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ShapeId> {
        self.built.get(name).copied()
    }

    /// Builds `def` under `name`, or returns the shape already built under that name.
    ///
    /// Inline boolean operands are built as `{name}_solid1` and
    /// `{name}_solid2`, inline composite components as `{name}_component{i}`,
    /// and the intermediate results of a composite as `{name}#{k}`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if a reference cannot be resolved, a reference
    /// cycle is found, or a primitive fails validation.
    pub fn build(
        &mut self,
        store: &mut GeometryStore,
        def: &ShapeDef,
        name: &str,
        warnings: &mut Warnings,
    ) -> Result<ShapeId> {
        if let Some(id) = self.get(name) {
            debug!(shape = name, "shape cache hit");
            return Ok(id);
        }
        if self.in_progress.iter().any(|n| n == name) {
            return Err(self.cycle(name));
        }

        self.in_progress.push(name.to_owned());
        let result = self.construct(store, def, name, warnings);
        self.in_progress.pop();

        let id = result?;
        self.built.insert(name.to_owned(), id);
        Ok(id)
    }

    fn construct(
        &mut self,
        store: &mut GeometryStore,
        def: &ShapeDef,
        name: &str,
        warnings: &mut Warnings,
    ) -> Result<ShapeId> {
        match def {
            ShapeDef::Primitive(primitive) => {
                let primitive = primitive.clone().validate(name)?;
                debug!(shape = name, kind = primitive.kind(), "built primitive");
                Ok(store.add_shape(ShapeData {
                    name: name.to_owned(),
                    extent: primitive.local_extent(),
                    solid: Solid::Primitive(primitive),
                }))
            }
            ShapeDef::Reference(reference) => self.lookup(name, reference),
            ShapeDef::Boolean(boolean) => {
                let first = self.operand(store, &boolean.first, &format!("{name}_solid1"), name, warnings)?;
                let second = self.operand(store, &boolean.second, &format!("{name}_solid2"), name, warnings)?;
                combine(store, name, boolean.op, first, second, boolean.transform)
            }
            ShapeDef::Composite(composite) => self.fold(store, composite, name, warnings),
        }
    }

    /// Resolves an operand: references are looked up, inline shapes are built.
    fn operand(
        &mut self,
        store: &mut GeometryStore,
        def: &ShapeDef,
        inline_name: &str,
        owner: &str,
        warnings: &mut Warnings,
    ) -> Result<ShapeId> {
        match def {
            ShapeDef::Reference(reference) => self.lookup(owner, reference),
            inline => self.build(store, inline, inline_name, warnings),
        }
    }

    fn lookup(&self, owner: &str, reference: &str) -> Result<ShapeId> {
        if let Some(id) = self.get(reference) {
            return Ok(id);
        }
        if self.in_progress.iter().any(|n| n == reference) {
            return Err(self.cycle(reference));
        }
        Err(ShapeError::UnresolvedShapeReference {
            shape: owner.to_owned(),
            reference: reference.to_owned(),
        }
        .into())
    }

    fn cycle(&self, name: &str) -> crate::error::DetgeomError {
        let start = self.in_progress.iter().position(|n| n == name).unwrap_or(0);
        let mut chain: Vec<String> = self.in_progress[start..].to_vec();
        chain.push(name.to_owned());
        ShapeError::CyclicShapeReference {
            shape: name.to_owned(),
            chain,
        }
        .into()
    }

    /// Folds a component list: the base, then every addition, then every subtraction.
    fn fold(
        &mut self,
        store: &mut GeometryStore,
        composite: &CompositeDef,
        name: &str,
        warnings: &mut Warnings,
    ) -> Result<ShapeId> {
        let Some((base, rest)) = composite.components.split_first() else {
            return Err(ShapeError::Degenerate {
                shape: name.to_owned(),
                reason: "composite has no components".into(),
            }
            .into());
        };

        let mut steps = Vec::with_capacity(rest.len());
        for (i, component) in rest.iter().enumerate() {
            let id = match &component.shape {
                ShapeDef::Reference(reference) => match self.lookup(name, reference) {
                    Ok(id) => id,
                    Err(crate::error::DetgeomError::Shape(
                        ShapeError::UnresolvedShapeReference { .. },
                    )) => {
                        warnings.push(BuildWarning::SkippedBooleanComponent {
                            shape: name.to_owned(),
                            reference: reference.clone(),
                        });
                        continue;
                    }
                    Err(err) => return Err(err),
                },
                inline => self.build(store, inline, &format!("{name}_component{}", i + 1), warnings)?,
            };
            let op = match component.op {
                ComponentOp::Add => BooleanOp::Union,
                ComponentOp::Subtract => BooleanOp::Subtract,
            };
            steps.push((op, id, component.transform));
        }
        // Stable: additions keep their relative order, as do subtractions.
        steps.sort_by_key(|(op, _, _)| *op == BooleanOp::Subtract);

        if steps.is_empty() {
            // A lone base is the composite itself.
            return match &base.shape {
                ShapeDef::Reference(reference) => self.lookup(name, reference),
                inline => self.construct(store, inline, name, warnings),
            };
        }

        let mut running = self.operand(store, &base.shape, &format!("{name}_component0"), name, warnings)?;
        let last = steps.len() - 1;
        for (k, (op, operand, transform)) in steps.into_iter().enumerate() {
            let node = if k == last { name.to_owned() } else { format!("{name}#{}", k + 1) };
            running = combine(store, &node, op, running, operand, transform)?;
            if k != last {
                self.built.insert(node, running);
            }
        }
        debug!(shape = name, "folded composite");
        Ok(running)
    }
}

fn combine(
    store: &mut GeometryStore,
    name: &str,
    op: BooleanOp,
    first: ShapeId,
    second: ShapeId,
    transform: Isometry3,
) -> Result<ShapeId> {
    let first_extent = store.shape(first)?.extent;
    let extent = match op {
        BooleanOp::Union => {
            let second_extent = store.shape(second)?.extent.transformed(&transform);
            first_extent.union(&second_extent)
        }
        BooleanOp::Subtract | BooleanOp::Intersect => first_extent,
    };
    debug!(shape = name, ?op, "built boolean");
    Ok(store.add_shape(ShapeData {
        name: name.to_owned(),
        solid: Solid::Boolean(BooleanSolid {
            op,
            first,
            second,
            transform,
        }),
        extent,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DetgeomError;
    use crate::math::{placement, Rotation3, Vector3};
    use crate::shape::{BooleanDef, BoxShape, ComponentDef, Orb, Primitive};

    fn cube(half: f64) -> ShapeDef {
        ShapeDef::Primitive(Primitive::Box(BoxShape {
            half_x: half,
            half_y: half,
            half_z: half,
        }))
    }

    fn orb(radius: f64) -> ShapeDef {
        ShapeDef::Primitive(Primitive::Orb(Orb { radius }))
    }

    fn shift(x: f64) -> Isometry3 {
        placement(Vector3::new(x, 0.0, 0.0), Rotation3::identity())
    }

    fn component(shape: ShapeDef, op: ComponentOp, x: f64) -> ComponentDef {
        ComponentDef {
            shape,
            op,
            transform: shift(x),
        }
    }

    /// Returns the boolean chain from the root down to the base as (op, second operand name).
    fn chain(store: &GeometryStore, mut id: ShapeId) -> Vec<(BooleanOp, String)> {
        let mut out = Vec::new();
        while let Solid::Boolean(b) = &store.shape(id).unwrap().solid {
            out.push((b.op, store.shape(b.second).unwrap().name.clone()));
            id = b.first;
        }
        out.reverse();
        out
    }

    #[test]
    fn build_is_memoized_by_name() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();

        let a = builder.build(&mut store, &cube(1.0), "Cube", &mut warnings).unwrap();
        let b = builder.build(&mut store, &orb(3.0), "Cube", &mut warnings).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.shape_count(), 1);
    }

    #[test]
    fn unbuilt_reference_is_fatal() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        let def = ShapeDef::Boolean(Box::new(BooleanDef {
            op: BooleanOp::Union,
            first: cube(1.0),
            second: ShapeDef::Reference("Later".into()),
            transform: Isometry3::identity(),
        }));

        let err = builder.build(&mut store, &def, "U", &mut warnings).unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Shape(ShapeError::UnresolvedShapeReference { ref reference, .. }) if reference == "Later"
        ));
        assert!(builder.get("U").is_none());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        let def = ShapeDef::Boolean(Box::new(BooleanDef {
            op: BooleanOp::Subtract,
            first: ShapeDef::Reference("Loop".into()),
            second: cube(1.0),
            transform: Isometry3::identity(),
        }));

        let err = builder.build(&mut store, &def, "Loop", &mut warnings).unwrap_err();
        match err {
            DetgeomError::Shape(ShapeError::CyclicShapeReference { shape, chain }) => {
                assert_eq!(shape, "Loop");
                assert_eq!(chain, vec!["Loop".to_owned(), "Loop".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pair_operands_get_derived_names() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        let def = ShapeDef::Boolean(Box::new(BooleanDef {
            op: BooleanOp::Intersect,
            first: cube(2.0),
            second: orb(2.5),
            transform: shift(1.0),
        }));

        let id = builder.build(&mut store, &def, "Cap", &mut warnings).unwrap();
        assert!(builder.get("Cap_solid1").is_some());
        assert!(builder.get("Cap_solid2").is_some());
        let Solid::Boolean(b) = &store.shape(id).unwrap().solid else {
            panic!("expected a boolean");
        };
        assert_eq!(b.transform, shift(1.0));
    }

    #[test]
    fn composite_adds_before_subtracting() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        for (name, def) in [("A", cube(1.0)), ("B", orb(1.0)), ("C", cube(0.5)), ("D", orb(0.2))] {
            builder.build(&mut store, &def, name, &mut warnings).unwrap();
        }

        let mixed = CompositeDef {
            components: vec![
                component(ShapeDef::Reference("A".into()), ComponentOp::Add, 0.0),
                component(ShapeDef::Reference("D".into()), ComponentOp::Subtract, 1.0),
                component(ShapeDef::Reference("B".into()), ComponentOp::Add, 2.0),
                component(ShapeDef::Reference("C".into()), ComponentOp::Add, 3.0),
            ],
        };
        let id = builder
            .build(&mut store, &ShapeDef::Composite(mixed), "Mixed", &mut warnings)
            .unwrap();

        assert_eq!(
            chain(&store, id),
            vec![
                (BooleanOp::Union, "B".to_owned()),
                (BooleanOp::Union, "C".to_owned()),
                (BooleanOp::Subtract, "D".to_owned()),
            ]
        );
        assert_eq!(store.shape(id).unwrap().name, "Mixed");
        assert!(builder.get("Mixed#1").is_some());
        assert!(warnings.is_empty());
    }

    #[test]
    fn composite_skips_unresolved_later_component() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();

        let def = ShapeDef::Composite(CompositeDef {
            components: vec![
                component(cube(1.0), ComponentOp::Add, 0.0),
                component(ShapeDef::Reference("Missing".into()), ComponentOp::Add, 1.0),
                component(orb(0.5), ComponentOp::Subtract, 0.0),
            ],
        });
        let id = builder.build(&mut store, &def, "Body", &mut warnings).unwrap();

        assert_eq!(
            chain(&store, id),
            vec![(BooleanOp::Subtract, "Body_component2".to_owned())]
        );
        assert_eq!(
            warnings.as_slice(),
            &[BuildWarning::SkippedBooleanComponent {
                shape: "Body".into(),
                reference: "Missing".into(),
            }]
        );
    }

    #[test]
    fn composite_with_unresolved_base_is_fatal() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        let def = ShapeDef::Composite(CompositeDef {
            components: vec![
                component(ShapeDef::Reference("Missing".into()), ComponentOp::Add, 0.0),
                component(cube(1.0), ComponentOp::Add, 1.0),
            ],
        });

        let err = builder.build(&mut store, &def, "Body", &mut warnings).unwrap_err();
        assert!(matches!(err, DetgeomError::Shape(ShapeError::UnresolvedShapeReference { .. })));
    }

    #[test]
    fn union_extent_covers_moved_operand() {
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = ShapeBuilder::new();
        let def = ShapeDef::Boolean(Box::new(BooleanDef {
            op: BooleanOp::Union,
            first: cube(1.0),
            second: cube(1.0),
            transform: shift(5.0),
        }));

        let id = builder.build(&mut store, &def, "Pair", &mut warnings).unwrap();
        let extent = store.shape(id).unwrap().extent;
        assert!((extent.max.x - 6.0).abs() < 1e-12);
        assert!((extent.min.x + 1.0).abs() < 1e-12);
    }
}
