//! Monitors behind `synchronized`/`lock` regions.
//!
//! Regions guarded by the same object share one monitor: `this` inside a
//! class and any value of that class map to `(class, "this")`, a class
//! literal to `(class, "class")`, other fields to `(declaring class, field)`.

use super::resolver::{LockTarget, Resolver};
use crate::ids::ClassId;
use crate::model::Expr;
use tracing::debug;

impl Resolver<'_, '_> {
    pub(super) fn sync_monitor(&mut self, guard: &str) -> LockTarget {
        let source = self.function.class;
        let parsed = self.builder.frontend.generate_expression(guard);
        let (class, segment) = match parsed {
            Some(expr) => self.monitor_of(&expr, source).unwrap_or_else(|| {
                debug!(guard, "guard is not a plain name, keying monitor by text");
                (source, compact(guard))
            }),
            None => (source, compact(guard)),
        };
        LockTarget::Monitor { class, segment }
    }

    fn monitor_of(&mut self, expr: &Expr, source: ClassId) -> Option<(ClassId, String)> {
        match expr {
            Expr::This => Some((source, "this".to_string())),
            Expr::Paren(inner) | Expr::Cast { operand: inner, .. } => self.monitor_of(inner, source),
            Expr::ClassLiteral(ty) => {
                let class = self.model.locate_class(&ty.text, Some(source))?;
                Some((class, "class".to_string()))
            }
            Expr::Identifier(name) => {
                if let Some(class) = self.value_class(expr) {
                    return Some((class, "this".to_string()));
                }
                let owner = self
                    .model
                    .lookup_field(source, name)
                    .map(|(owner, _)| owner)
                    .unwrap_or(source);
                Some((owner, name.clone()))
            }
            Expr::Member { target, name } => {
                if let Some(class) = self.value_class(expr) {
                    return Some((class, "this".to_string()));
                }
                let target_class = self.value_class(target);
                let owner = target_class
                    .and_then(|class| self.model.member_field(class, name))
                    .map(|(owner, _)| owner)
                    .or(target_class)
                    .unwrap_or(source);
                Some((owner, name.clone()))
            }
            _ => None,
        }
    }

    /// User class of the value `expr` evaluates to, when it is one.
    fn value_class(&mut self, expr: &Expr) -> Option<ClassId> {
        let resolved = self.peek(expr);
        if resolved.is_type_name {
            return None;
        }
        resolved.single().and_then(|ty| self.user_class(ty))
    }
}

fn compact(guard: &str) -> String {
    guard.chars().filter(|c| !c.is_whitespace()).collect()
}
