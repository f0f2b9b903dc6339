//! Condition evaluation
//!
//! A condition tree is a single recursive [`Condition`] value. Composites
//! (`and`, `or`, `xor`, `not`) hold their children in registration order and
//! evaluate them depth-first on the calling thread; leaves wrap one concrete
//! check. Attributes are validated when a node is built, so a constructed
//! tree is always fully configured.
//!
//! `and` and `or` short-circuit: once the result is known the remaining
//! children are not evaluated at all.

pub mod build;
pub mod container;
pub mod context;
pub mod file;
pub mod net;
pub mod os;
pub mod string;

pub use build::*;
pub use container::*;
pub use context::*;
pub use file::*;
pub use net::*;
pub use os::*;
pub use string::*;

use crate::error::ConditionResult;
use std::fmt;
use std::sync::Arc;

/// A leaf supplied from outside the built-in set
pub trait Predicate: fmt::Debug + Send + Sync {
    /// Tag used in diagnostics
    fn name(&self) -> &str;

    fn eval(&self, ctx: &EvalContext<'_>) -> ConditionResult<bool>;
}

/// A node of a condition tree
#[derive(Debug, Clone)]
pub enum Condition {
    /// True when every child is true; no children is true
    And(Vec<Condition>),
    /// True when any child is true; no children is false
    Or(Vec<Condition>),
    /// True when an odd number of children is true; evaluates every child
    Xor(Vec<Condition>),
    Not(Box<Condition>),

    Equals(Equals),
    Contains(Contains),
    Matches(Matches),
    IsSet(IsSet),
    IsTrue(IsTrue),
    IsFalse(IsFalse),
    Os(Os),
    Available(Available),
    FilesMatch(FilesMatch),
    IsLastModified(IsLastModified),
    UpToDate(UpToDate),
    Socket(Socket),
    Http(Http),
    IsReachable(IsReachable),

    Custom(Arc<dyn Predicate>),
}

impl Condition {
    pub fn and(children: ConditionContainer) -> Self {
        Condition::And(children.into_vec())
    }

    pub fn or(children: ConditionContainer) -> Self {
        Condition::Or(children.into_vec())
    }

    pub fn xor(children: ConditionContainer) -> Self {
        Condition::Xor(children.into_vec())
    }

    /// `<not>` takes exactly one nested condition
    pub fn not(children: ConditionContainer) -> ConditionResult<Self> {
        Ok(Condition::Not(Box::new(children.into_single("not")?)))
    }

    /// Negate an already built condition
    pub fn negate(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    pub fn custom(predicate: impl Predicate + 'static) -> Self {
        Condition::Custom(Arc::new(predicate))
    }

    /// Tag name as written in a build file
    pub fn tag(&self) -> &str {
        match self {
            Condition::And(_) => "and",
            Condition::Or(_) => "or",
            Condition::Xor(_) => "xor",
            Condition::Not(_) => "not",
            Condition::Equals(_) => "equals",
            Condition::Contains(_) => "contains",
            Condition::Matches(_) => "matches",
            Condition::IsSet(_) => "isset",
            Condition::IsTrue(_) => "istrue",
            Condition::IsFalse(_) => "isfalse",
            Condition::Os(_) => "os",
            Condition::Available(_) => "available",
            Condition::FilesMatch(_) => "filesmatch",
            Condition::IsLastModified(_) => "islastmodified",
            Condition::UpToDate(_) => "uptodate",
            Condition::Socket(_) => "socket",
            Condition::Http(_) => "http",
            Condition::IsReachable(_) => "isreachable",
            Condition::Custom(predicate) => predicate.name(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Condition::And(_) | Condition::Or(_) | Condition::Xor(_) | Condition::Not(_)
        )
    }

    /// Nested conditions, in evaluation order
    pub fn children(&self) -> &[Condition] {
        match self {
            Condition::And(children) | Condition::Or(children) | Condition::Xor(children) => {
                children
            }
            Condition::Not(child) => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }

    /// Evaluate the tree against the current state of the build
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> ConditionResult<bool> {
        match self {
            Condition::And(children) => {
                for (index, child) in children.iter().enumerate() {
                    if !child.evaluate(ctx)? {
                        log::trace!(
                            "<and> decided by child {} of {}",
                            index + 1,
                            children.len()
                        );
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for (index, child) in children.iter().enumerate() {
                    if child.evaluate(ctx)? {
                        log::trace!(
                            "<or> decided by child {} of {}",
                            index + 1,
                            children.len()
                        );
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Xor(children) => {
                let mut state = false;
                for child in children {
                    state ^= child.evaluate(ctx)?;
                }
                Ok(state)
            }
            Condition::Not(child) => Ok(!child.evaluate(ctx)?),

            Condition::Equals(equals) => Ok(equals.evaluate()),
            Condition::Contains(contains) => Ok(contains.evaluate()),
            Condition::Matches(matches) => Ok(matches.evaluate()),
            Condition::IsSet(isset) => Ok(isset.evaluate(ctx.properties)),
            Condition::IsTrue(istrue) => Ok(istrue.evaluate()),
            Condition::IsFalse(isfalse) => Ok(isfalse.evaluate()),
            Condition::Os(os) => Ok(os.evaluate(ctx.os())),
            Condition::Available(available) => Ok(available.evaluate()),
            Condition::FilesMatch(files) => files.evaluate(),
            Condition::IsLastModified(modified) => Ok(modified.evaluate()),
            Condition::UpToDate(uptodate) => uptodate.evaluate(),
            Condition::Socket(socket) => Ok(socket.evaluate()),
            Condition::Http(http) => http.evaluate(),
            Condition::IsReachable(reachable) => Ok(reachable.evaluate()),

            Condition::Custom(predicate) => predicate.eval(ctx),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.tag())?;
        for child in self.children() {
            write!(f, "{}", child)?;
        }
        if self.is_composite() {
            write!(f, "</{}>", self.tag())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConditionError;
    use crate::runner::Properties;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Leaf with a fixed answer that counts how often it was asked
    #[derive(Debug)]
    struct Recording {
        answer: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Predicate for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn eval(&self, _ctx: &EvalContext<'_>) -> ConditionResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Predicate for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn eval(&self, _ctx: &EvalContext<'_>) -> ConditionResult<bool> {
            Err(ConditionError::evaluation("probe failed"))
        }
    }

    fn recording(answer: bool) -> (Condition, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let condition = Condition::custom(Recording {
            answer,
            calls: Arc::clone(&calls),
        });
        (condition, calls)
    }

    fn constant(answer: bool) -> Condition {
        Condition::IsTrue(IsTrue::new(if answer { "true" } else { "false" }))
    }

    fn eval(condition: &Condition) -> ConditionResult<bool> {
        let props = Properties::new();
        let env = Environment::default();
        condition.evaluate(&EvalContext::new(&props, &env))
    }

    fn container(children: Vec<Condition>) -> ConditionContainer {
        children.into_iter().collect()
    }

    #[test]
    fn test_and_truth_table() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let and = Condition::and(container(vec![constant(a), constant(b)]));
            assert_eq!(eval(&and).unwrap(), a && b);
        }
    }

    #[test]
    fn test_or_truth_table() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let or = Condition::or(container(vec![constant(a), constant(b)]));
            assert_eq!(eval(&or).unwrap(), a || b);
        }
    }

    #[test]
    fn test_xor_counts_true_children() {
        let xor = Condition::xor(container(vec![constant(true), constant(true), constant(true)]));
        assert!(eval(&xor).unwrap());
        let xor = Condition::xor(container(vec![constant(true), constant(true)]));
        assert!(!eval(&xor).unwrap());
        assert!(!eval(&Condition::xor(ConditionContainer::new())).unwrap());
    }

    #[test]
    fn test_empty_composites() {
        assert!(eval(&Condition::and(ConditionContainer::new())).unwrap());
        assert!(!eval(&Condition::or(ConditionContainer::new())).unwrap());
    }

    #[test]
    fn test_not_negates() {
        for answer in [true, false] {
            let not = Condition::not(container(vec![constant(answer)])).unwrap();
            assert_eq!(eval(&not).unwrap(), !answer);
            assert_eq!(eval(&Condition::negate(constant(answer))).unwrap(), !answer);
        }
    }

    #[test]
    fn test_not_arity() {
        let err = Condition::not(ConditionContainer::new()).unwrap_err();
        assert_eq!(err.to_string(), "You must nest a condition into <not>");
        assert!(err.is_configuration());

        let err = Condition::not(container(vec![constant(true), constant(false)])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must not nest more than one condition into <not>"
        );
    }

    #[test]
    fn test_and_short_circuits() {
        let (second, calls) = recording(true);
        let and = Condition::and(container(vec![constant(false), second]));
        assert!(!eval(&and).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_or_short_circuits() {
        let (second, calls) = recording(false);
        let or = Condition::or(container(vec![constant(true), second]));
        assert!(eval(&or).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_children_run_in_order_until_decided() {
        let (first, first_calls) = recording(true);
        let (second, second_calls) = recording(false);
        let (third, third_calls) = recording(true);
        let and = Condition::and(container(vec![first, second, third]));

        assert!(!eval(&and).unwrap());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_xor_does_not_short_circuit() {
        let (first, _) = recording(true);
        let (second, second_calls) = recording(true);
        let xor = Condition::xor(container(vec![first, second]));
        assert!(!eval(&xor).unwrap());
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_re_evaluation_is_stable() {
        let (leaf, calls) = recording(true);
        let or = Condition::or(container(vec![constant(false), leaf]));
        for _ in 0..3 {
            assert!(eval(&or).unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_errors_propagate() {
        let and = Condition::and(container(vec![constant(true), Condition::custom(Failing)]));
        let err = eval(&and).unwrap_err();
        assert!(!err.is_configuration());

        // a decided composite never reaches the failing leaf
        let or = Condition::or(container(vec![constant(true), Condition::custom(Failing)]));
        assert!(eval(&or).unwrap());
    }

    #[test]
    fn test_isset_reads_properties() {
        let mut props = Properties::new();
        props.set("ready", "yes");
        let env = Environment::default();
        let ctx = EvalContext::new(&props, &env);

        assert!(Condition::IsSet(IsSet::new("ready")).evaluate(&ctx).unwrap());
        assert!(!Condition::IsSet(IsSet::new("other")).evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_os_uses_environment_description() {
        let props = Properties::new();
        let env = Environment::default().with_os(OsInfo::new("Windows 10", "amd64", "10.0", ';'));
        let ctx = EvalContext::new(&props, &env);

        let unix = Condition::Os(Os::new().with_family("unix").unwrap());
        let windows = Condition::Os(Os::new().with_family("windows").unwrap());
        assert!(!unix.evaluate(&ctx).unwrap());
        assert!(windows.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_display_and_children() {
        let tree = Condition::or(container(vec![
            Condition::Equals(Equals::new("x", "x")),
            Condition::negate(Condition::IsSet(IsSet::new("p"))),
        ]));
        assert_eq!(tree.to_string(), "<or><equals><not><isset></not></or>");
        assert_eq!(tree.children().len(), 2);
        assert!(tree.is_composite());
        assert!(!tree.children()[0].is_composite());
    }
}
