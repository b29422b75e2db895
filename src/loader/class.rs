//! The bytecode-facing model: defined classes, reflective members, and the
//! contract of the component that turns staged bytecode into classes.

use std::any::Any;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::utils::SharedBytes;

/// A class defined into a loader: its dotted name, the package derived from
/// it, and the bytecode it was defined from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    name: String,
    package: Option<String>,
    code: SharedBytes,
}

impl ClassEntry {
    pub fn new<T: Into<String>>(name: T, code: SharedBytes) -> Self {
        let name = name.into();
        let package = name.rfind('.').map(|index| name[..index].to_owned());
        ClassEntry {
            name,
            package,
            code,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package of the class, or none for an unpackaged name.
    #[inline]
    pub fn package(&self) -> Option<&str> {
        self.package.as_ref().map(|v| v.as_str())
    }

    /// A view of the bytecode the class was defined from.
    #[inline]
    pub fn bytecode(&self) -> SharedBytes {
        self.code.share()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
}

/// A reflective member of a defined class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    pub descriptor: String,
}

/// An opaque adapter value owned by a collaborator: a functional interface
/// bound to a target, a compiled invoker, or whatever else only makes sense
/// relative to one loader. The cache stores these per loader and drops them
/// wholesale when the loader goes away.
pub type Binding = Arc<dyn Any + Send + Sync>;

/// A reflective member paired with its bound invoker.
#[derive(Clone)]
pub struct MemberHandle {
    pub member: Member,
    pub invoker: Binding,
}

impl MemberHandle {
    pub fn new(member: Member, invoker: Binding) -> Self {
        MemberHandle { member, invoker }
    }
}

/// Raised by a `Definer` when bytecode cannot be turned into a class.
#[derive(Debug, Fail)]
pub enum DefineError {
    /// The class references another class the loader chain cannot resolve.
    /// The loader purges the staged entry and propagates; re-staging the
    /// dependency makes the definition recoverable.
    #[fail(display = "Class {} references class {} which could not be found.", name, dependency)]
    MissingDependency { name: String, dependency: String },
    #[fail(display = "Bytecode of class {} is malformed: {}.", name, reason)]
    Malformed { name: String, reason: String },
}

/// The compiler/bytecode collaborator boundary: defines a class from staged
/// bytecode. `resolve` reports whether a referenced class name is resolvable
/// through the requesting loader's chain; unresolvable references surface as
/// [`DefineError::MissingDependency`].
pub trait Definer: Send + Sync {
    fn define(
        &self,
        name: &str,
        code: &SharedBytes,
        resolve: &mut dyn FnMut(&str) -> bool,
    ) -> ::std::result::Result<ClassEntry, DefineError>;
}

const MAGIC: &[u8; 4] = b"CRCL";

/// The baseline definer over the minimal class-blob layout: a four byte
/// magic, a big-endian u16 count of referenced class names (each a u16
/// length plus utf-8 bytes), then the class body. Embedders with a real
/// bytecode pipeline plug in their own `Definer` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicDefiner;

impl BasicDefiner {
    pub fn new() -> Self {
        BasicDefiner
    }

    /// Assembles a class blob in the layout `define` expects.
    pub fn assemble(dependencies: &[&str], body: &[u8]) -> SharedBytes {
        let mut buf = Vec::with_capacity(8 + body.len());
        buf.write_all(MAGIC).unwrap();
        buf.write_u16::<BigEndian>(dependencies.len() as u16).unwrap();
        for dependency in dependencies {
            buf.write_u16::<BigEndian>(dependency.len() as u16).unwrap();
            buf.write_all(dependency.as_bytes()).unwrap();
        }
        buf.write_all(body).unwrap();
        buf.into()
    }
}

impl Definer for BasicDefiner {
    fn define(
        &self,
        name: &str,
        code: &SharedBytes,
        resolve: &mut dyn FnMut(&str) -> bool,
    ) -> ::std::result::Result<ClassEntry, DefineError> {
        let malformed = |reason: &str| DefineError::Malformed {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };

        let mut cursor = Cursor::new(code.as_slice());

        let mut magic = [0u8; 4];
        cursor
            .read_exact(&mut magic)
            .map_err(|_| malformed("truncated header"))?;
        if &magic != MAGIC {
            return Err(malformed("bad magic"));
        }

        let count = cursor
            .read_u16::<BigEndian>()
            .map_err(|_| malformed("truncated dependency table"))?;

        for _ in 0..count {
            let len = cursor
                .read_u16::<BigEndian>()
                .map_err(|_| malformed("truncated dependency table"))?;

            let mut bytes = vec![0u8; len as usize];
            cursor
                .read_exact(&mut bytes)
                .map_err(|_| malformed("truncated dependency table"))?;

            let dependency =
                String::from_utf8(bytes).map_err(|_| malformed("dependency name is not utf-8"))?;

            if dependency != name && !resolve(&dependency) {
                return Err(DefineError::MissingDependency {
                    name: name.to_owned(),
                    dependency,
                });
            }
        }

        Ok(ClassEntry::new(name, code.share()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packages_derive_from_names() {
        let entry = ClassEntry::new("org.demo.Widget", SharedBytes::from(vec![]));
        assert_eq!(entry.package(), Some("org.demo"));

        let entry = ClassEntry::new("Widget", SharedBytes::from(vec![]));
        assert_eq!(entry.package(), None);
    }

    #[test]
    fn defines_with_resolvable_dependencies() {
        let code = BasicDefiner::assemble(&["org.demo.Base"], b"body");
        let entry = BasicDefiner::new()
            .define("org.demo.Widget", &code, &mut |name| name == "org.demo.Base")
            .unwrap();
        assert_eq!(entry.name(), "org.demo.Widget");
    }

    #[test]
    fn missing_dependency_is_reported() {
        let code = BasicDefiner::assemble(&["org.demo.Base"], b"body");
        let err = BasicDefiner::new()
            .define("org.demo.Widget", &code, &mut |_| false)
            .unwrap_err();

        match err {
            DefineError::MissingDependency { dependency, .. } => {
                assert_eq!(dependency, "org.demo.Base");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let err = BasicDefiner::new()
            .define("demo.Widget", &SharedBytes::from(vec![1u8, 2, 3]), &mut |_| true)
            .unwrap_err();

        match err {
            DefineError::Malformed { .. } => {}
            other => panic!("unexpected error: {}", other),
        }
    }
}
