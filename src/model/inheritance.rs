//! Inheritance tree and ancestor flattening.

use crate::errors::ModelError;
use crate::ids::ClassId;
use std::collections::HashSet;

/// Class → immediate subclasses, the exact inverse of the supertype lists.
#[derive(Debug, Clone, Default)]
pub struct InheritanceTree {
    subclasses: Vec<Vec<ClassId>>,
}

impl InheritanceTree {
    /// Build from each class's resolved supertypes, indexed by class id.
    pub fn build(supertypes: &[Vec<ClassId>]) -> Self {
        let mut subclasses = vec![Vec::new(); supertypes.len()];
        for (index, supers) in supertypes.iter().enumerate() {
            for sup in supers {
                if let Some(children) = subclasses.get_mut(sup.index()) {
                    let child = ClassId::from_index(index);
                    if !children.contains(&child) {
                        children.push(child);
                    }
                }
            }
        }
        Self { subclasses }
    }

    pub fn subclasses(&self, class: ClassId) -> &[ClassId] {
        self.subclasses
            .get(class.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every transitive subclass once, depth-first in declaration order.
    pub fn transitive_subclasses(&self, class: ClassId) -> Vec<ClassId> {
        let mut seen = HashSet::from([class]);
        let mut out = Vec::new();
        let mut stack: Vec<ClassId> = self.subclasses(class).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.subclasses(next).iter().rev().copied());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.subclasses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subclasses.is_empty()
    }
}

/// Flatten every class's ancestors, failing on any supertype cycle.
///
/// `name` labels classes in the error.
pub fn flatten_ancestors(
    supertypes: &[Vec<ClassId>],
    name: &dyn Fn(ClassId) -> String,
) -> Result<Vec<Vec<ClassId>>, ModelError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        class: ClassId,
        supertypes: &[Vec<ClassId>],
        marks: &mut [Mark],
        path: &mut Vec<ClassId>,
        name: &dyn Fn(ClassId) -> String,
    ) -> Result<(), ModelError> {
        match marks[class.index()] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = path.iter().position(|c| *c == class).unwrap_or(0);
                let cycle: Vec<String> = path[start..]
                    .iter()
                    .chain(std::iter::once(&class))
                    .map(|c| name(*c))
                    .collect();
                return Err(ModelError::CyclicInheritance {
                    class: name(class),
                    cycle: cycle.join(" -> "),
                });
            }
            Mark::New => {}
        }
        marks[class.index()] = Mark::Active;
        path.push(class);
        for sup in &supertypes[class.index()] {
            if sup.index() < supertypes.len() {
                visit(*sup, supertypes, marks, path, name)?;
            }
        }
        path.pop();
        marks[class.index()] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::New; supertypes.len()];
    for index in 0..supertypes.len() {
        visit(
            ClassId::from_index(index),
            supertypes,
            &mut marks,
            &mut Vec::new(),
            name,
        )?;
    }

    // Acyclic now, so a plain preorder walk terminates.
    let ancestors = (0..supertypes.len())
        .map(|index| {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            let mut stack: Vec<ClassId> = supertypes[index].iter().rev().copied().collect();
            while let Some(next) = stack.pop() {
                if next.index() >= supertypes.len() || !seen.insert(next) {
                    continue;
                }
                out.push(next);
                stack.extend(supertypes[next.index()].iter().rev().copied());
            }
            out
        })
        .collect();
    Ok(ancestors)
}
