//! Capability descriptors and profiling eligibility
//!
//! Rust has no runtime reflection, so a capability trait describes itself with
//! a static [`CapabilityType`]: its module-qualified path, the methods it
//! declares (each marked profiled or plain) and the capability types it
//! extends. The profiler walks this table once per `wrap()` call to decide
//! which methods get timed.
//!
//! The [`capability!`](crate::capability!) macro builds the descriptor from a
//! trait-like listing, with `#[profiled]` as the marker:
//!
//! ```
//! use crawl_profiler::capability;
//!
//! capability! {
//!     pub static PAGE_SOURCE: PageSource {
//!         #[profiled] fn load(&std::path::Path);
//!     }
//! }
//!
//! capability! {
//!     pub static PAGE_PARSER: PageParser extends [PAGE_SOURCE] {
//!         fn name();
//!     }
//! }
//!
//! assert!(PAGE_PARSER.has_profiled_methods());
//! ```

use std::collections::HashMap;
use std::fmt;

/// One method declaration of a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDecl {
    /// Method name
    pub name: &'static str,
    /// Formal parameter types, excluding the receiver
    pub params: &'static [&'static str],
    /// Whether calls to this method are timed
    pub profiled: bool,
}

impl MethodDecl {
    fn matches(&self, name: &str, params: &[&str]) -> bool {
        self.name == name && self.params == params
    }
}

/// Static description of a capability trait and its ancestry
///
/// Usually declared through [`capability!`](crate::capability!).
#[derive(Debug)]
pub struct CapabilityType {
    /// Short capability name
    pub name: &'static str,
    /// Module-qualified name, e.g. `crawl_profiler::corpus::PageParser`
    pub path: &'static str,
    /// Methods declared directly on this capability
    pub methods: &'static [MethodDecl],
    /// Capabilities this one extends
    pub parents: &'static [&'static CapabilityType],
}

impl CapabilityType {
    /// Short capability name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Module-qualified name; identifies the capability in keys and reports
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// This capability followed by every ancestor, depth-first
    ///
    /// Each type appears once, even when reachable through several paths.
    pub fn hierarchy(&'static self) -> Vec<&'static CapabilityType> {
        let mut seen: Vec<&'static CapabilityType> = Vec::new();
        let mut stack = vec![self];
        while let Some(ty) = stack.pop() {
            if seen.iter().any(|s| std::ptr::eq(*s, ty)) {
                continue;
            }
            seen.push(ty);
            // Reverse so the first listed parent is visited first
            stack.extend(ty.parents.iter().rev().copied());
        }
        seen
    }

    /// Whether this capability or any ancestor declares a profiled method
    pub fn has_profiled_methods(&'static self) -> bool {
        self.hierarchy()
            .iter()
            .flat_map(|ty| ty.methods.iter())
            .any(|m| m.profiled)
    }

    /// Find the original declaration of a method anywhere in the hierarchy
    ///
    /// Returns the declaring type together with the declaration. The first
    /// match in [`CapabilityType::hierarchy`] order wins.
    pub fn resolve(
        &'static self,
        name: &str,
        params: &[&str],
    ) -> Option<(&'static CapabilityType, &'static MethodDecl)> {
        self.hierarchy().into_iter().find_map(|ty| {
            ty.methods
                .iter()
                .find(|m| m.matches(name, params))
                .map(|m| (ty, m))
        })
    }
}

/// Declare a static [`CapabilityType`]
///
/// Parameter types are recorded as written, so `fetch(&str)` and
/// `fetch(&str, usize)` are distinct overloads. The path is qualified with
/// the module the macro is invoked in.
#[macro_export]
macro_rules! capability {
    (
        $vis:vis static $ident:ident : $name:ident
        $(extends [$($parent:path),* $(,)?])?
        {
            $($(#[$marker:ident])? fn $method:ident ( $($param:ty),* $(,)? ) ;)*
        }
    ) => {
        $vis static $ident: $crate::capability::CapabilityType =
            $crate::capability::CapabilityType {
                name: stringify!($name),
                path: concat!(module_path!(), "::", stringify!($name)),
                methods: &[$(
                    $crate::capability::MethodDecl {
                        name: stringify!($method),
                        params: &[$(stringify!($param)),*],
                        profiled: $crate::__capability_marker!($($marker)?),
                    }
                ),*],
                parents: &[$($(&$parent),*)?],
            };
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __capability_marker {
    () => {
        false
    };
    (profiled) => {
        true
    };
}

/// Identity under which timing data is aggregated
///
/// Declaring type, method name and parameter signature. Ordering follows that
/// field order, which is also the order of report lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    /// Module-qualified path of the declaring capability
    pub declaring_type: &'static str,
    pub method: &'static str,
    pub params: &'static [&'static str],
}

impl MethodKey {
    pub fn new(declaring_type: &'static CapabilityType, method: &'static MethodDecl) -> Self {
        Self {
            declaring_type: declaring_type.path,
            method: method.name,
            params: method.params,
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({})",
            self.declaring_type,
            self.method,
            self.params.join(", ")
        )
    }
}

/// How a forwarded call is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility<'a> {
    /// Timed and recorded under the key of the original declaration
    Profiled(&'a MethodKey),
    /// Declared without the profiled marker
    Plain,
    /// No type in the hierarchy declares this signature
    Undeclared,
}

type Signature = (&'static str, &'static [&'static str]);

/// Every method signature reachable from one capability
///
/// Built once when a wrapper is created. Keys are `(method name, params)` as
/// seen by the caller; profiled entries carry the key of the original
/// declaration.
#[derive(Debug, Clone, Default)]
pub struct EligibilityTable {
    declared: HashMap<Signature, Option<MethodKey>>,
}

impl EligibilityTable {
    /// Build the table for `capability`
    ///
    /// A method declared in several types of the hierarchy is resolved to its
    /// first declaration, and only counts as profiled if that one is.
    pub fn build(capability: &'static CapabilityType) -> Self {
        let mut declared = HashMap::new();
        for ty in capability.hierarchy() {
            for method in ty.methods {
                declared
                    .entry((method.name, method.params))
                    .or_insert_with(|| method.profiled.then(|| MethodKey::new(ty, method)));
            }
        }
        Self { declared }
    }

    pub fn lookup(&self, name: &'static str, params: &'static [&'static str]) -> Eligibility<'_> {
        match self.declared.get(&(name, params)) {
            Some(Some(key)) => Eligibility::Profiled(key),
            Some(None) => Eligibility::Plain,
            None => Eligibility::Undeclared,
        }
    }

    /// Number of profiled methods
    pub fn len(&self) -> usize {
        self.declared.values().filter(|key| key.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of declared signatures, profiled or plain
    pub fn declared_len(&self) -> usize {
        self.declared.len()
    }
}
