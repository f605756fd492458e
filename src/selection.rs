//! Member selection
//!
//! Decides which constructor builds a type and which methods and fields are
//! injected afterwards. Explicit [`InjectionMember`]s always win. Otherwise
//! members marked for injection are used, and constructors fall back to the
//! public constructor with the most parameters.
//!
//! When several constructors are marked, the same arity rule is applied to
//! the marked set: the longest one wins and a tie is ambiguous.

use crate::injection::{Directive, InjectionMember};
use crate::introspect::{Constructor, Field, Member, Method, TypeIntrospector};
use crate::types::Type;
use crate::DiError;

/// Outcome of selecting one member
#[derive(Debug, Clone)]
pub enum Selection<M> {
    /// Member chosen by marker or default rule; arguments come from the
    /// member's declared parameters
    Member(M),
    /// Member pinned by an explicit directive, with its argument sources
    Injected { member: M, directives: Vec<Directive> },
    /// Selection failed; the error is raised only if the member is needed
    Deferred(DiError),
    /// The type offers nothing to select from
    NotFound,
}

impl<M> Selection<M> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Selection::Deferred(_))
    }
}

/// Pluggable selection algorithm.
pub trait MemberSelector: Send + Sync {
    fn select_constructor(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Selection<Constructor>;

    fn select_methods(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Vec<Selection<Method>>;

    fn select_fields(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Vec<Selection<Field>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMemberSelector;

impl DefaultMemberSelector {
    /// Longest constructor of `candidates`; a tie at the top is ambiguous
    fn longest(ty: &Type, mut candidates: Vec<Constructor>) -> Selection<Constructor> {
        candidates.sort_by_key(|ctor| std::cmp::Reverse(ctor.arity()));
        let mut candidates = candidates.into_iter();
        let Some(first) = candidates.next() else {
            return Selection::Deferred(DiError::NoPublicConstructor {
                type_name: ty.name(),
            });
        };
        match candidates.next() {
            Some(second) if second.arity() == first.arity() => {
                Selection::Deferred(DiError::AmbiguousConstructor {
                    type_name: ty.name(),
                    arity: first.arity(),
                })
            }
            _ => Selection::Member(first),
        }
    }

    fn explicit_constructor(
        ty: &Type,
        declared: Vec<Constructor>,
        args: &[Directive],
    ) -> Selection<Constructor> {
        let matching = declared.into_iter().find(|ctor| {
            ctor.arity() == args.len()
                && ctor
                    .parameters()
                    .iter()
                    .zip(args)
                    .all(|(parameter, directive)| directive.fits(parameter))
        });
        match matching {
            Some(member) => Selection::Injected {
                member,
                directives: args.to_vec(),
            },
            None => Selection::Deferred(DiError::invalid_registration(format!(
                "{} has no constructor matching the {} supplied arguments",
                ty.name(),
                args.len()
            ))),
        }
    }
}

impl MemberSelector for DefaultMemberSelector {
    fn select_constructor(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Selection<Constructor> {
        if !introspector.is_constructible(ty) {
            return Selection::NotFound;
        }
        let declared = introspector.declared_constructors(ty);

        let explicit = members.iter().find_map(|member| match member {
            InjectionMember::Constructor(args) => Some(args),
            _ => None,
        });
        if let Some(args) = explicit {
            return Self::explicit_constructor(ty, declared, args);
        }

        let marked: Vec<_> = declared
            .iter()
            .filter(|ctor| introspector.is_marked_for_injection(Member::Constructor(ctor)))
            .cloned()
            .collect();
        if !marked.is_empty() {
            return Self::longest(ty, marked);
        }

        let public = declared.into_iter().filter(Constructor::is_public).collect();
        Self::longest(ty, public)
    }

    fn select_methods(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Vec<Selection<Method>> {
        let declared = introspector.declared_methods(ty);
        let mut selected = Vec::new();
        let mut explicit_names = Vec::new();

        for member in members {
            let InjectionMember::Method { name, args } = member else {
                continue;
            };
            explicit_names.push(*name);
            let found = declared.iter().find(|method| {
                method.name() == *name
                    && method.parameters().len() == args.len()
                    && method
                        .parameters()
                        .iter()
                        .zip(args)
                        .all(|(parameter, directive)| directive.fits(parameter))
            });
            selected.push(match found {
                Some(method) => Selection::Injected {
                    member: method.clone(),
                    directives: args.clone(),
                },
                None => Selection::Deferred(DiError::invalid_registration(format!(
                    "{} has no method `{name}` taking {} arguments",
                    ty.name(),
                    args.len()
                ))),
            });
        }

        selected.extend(
            declared
                .iter()
                .filter(|method| !explicit_names.contains(&method.name()))
                .filter(|method| method.is_eligible())
                .filter(|method| introspector.is_marked_for_injection(Member::Method(method)))
                .cloned()
                .map(Selection::Member),
        );
        selected
    }

    fn select_fields(
        &self,
        ty: &Type,
        members: &[InjectionMember],
        introspector: &dyn TypeIntrospector,
    ) -> Vec<Selection<Field>> {
        let declared = introspector.declared_fields(ty);
        let mut selected = Vec::new();
        let mut explicit_names = Vec::new();

        for member in members {
            let InjectionMember::Field { name, value } = member else {
                continue;
            };
            explicit_names.push(*name);
            let found = declared.iter().find(|field| field.name() == *name);
            selected.push(match (found, value) {
                (Some(field), Some(directive)) if directive.fits(field.value()) => {
                    Selection::Injected {
                        member: field.clone(),
                        directives: vec![directive.clone()],
                    }
                }
                (Some(field), None) => Selection::Member(field.clone()),
                (Some(_), Some(directive)) => Selection::Deferred(DiError::invalid_registration(
                    format!(
                        "field `{name}` of {} cannot take a value of type {}",
                        ty.name(),
                        directive.ty()
                    ),
                )),
                (None, _) => Selection::Deferred(DiError::invalid_registration(format!(
                    "{} has no field `{name}`",
                    ty.name()
                ))),
            });
        }

        selected.extend(
            declared
                .iter()
                .filter(|field| !explicit_names.contains(&field.name()))
                .filter(|field| field.is_eligible())
                .filter(|field| introspector.is_marked_for_injection(Member::Field(field)))
                .cloned()
                .map(Selection::Member),
        );
        selected
    }
}
