//! Python builtins that are always bound
//!
//! Table driven so adding a builtin is one line.

/// Builtin functions, types and constants available without import
pub const BUILTIN_NAMES: &[&str] = &[
    // I/O and conversion
    "print",
    "input",
    "open",
    "int",
    "float",
    "str",
    "bool",
    "bytes",
    "bytearray",
    "list",
    "dict",
    "set",
    "frozenset",
    "tuple",
    "object",
    "type",
    "repr",
    "format",
    "chr",
    "ord",
    "hex",
    "bin",
    "oct",
    // Collections and iteration
    "len",
    "range",
    "enumerate",
    "zip",
    "map",
    "filter",
    "sorted",
    "reversed",
    "iter",
    "next",
    "slice",
    "sum",
    "min",
    "max",
    "abs",
    "round",
    "pow",
    "divmod",
    "any",
    "all",
    // Objects and introspection
    "isinstance",
    "issubclass",
    "getattr",
    "setattr",
    "hasattr",
    "delattr",
    "callable",
    "super",
    "id",
    "hash",
    "vars",
    "dir",
    "globals",
    "locals",
    "help",
    "staticmethod",
    "classmethod",
    "property",
    "exit",
    "quit",
    "NotImplemented",
    "Ellipsis",
    "__name__",
    "__file__",
    // Exceptions
    "BaseException",
    "Exception",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "EOFError",
    "FileNotFoundError",
    "ImportError",
    "IndexError",
    "KeyError",
    "KeyboardInterrupt",
    "LookupError",
    "NameError",
    "NotImplementedError",
    "OSError",
    "PermissionError",
    "RuntimeError",
    "StopIteration",
    "TimeoutError",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
];

/// Whether `name` is a Python builtin
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Builtins that name a class, usable as type hints
pub fn is_builtin_class(name: &str) -> bool {
    is_builtin(name) && (name == "object" || name.ends_with("Error") || name.ends_with("Exception"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert!(is_builtin("print"));
        assert!(is_builtin("ValueError"));
        assert!(!is_builtin("json"));
    }

    #[test]
    fn test_builtin_classes() {
        assert!(is_builtin_class("KeyError"));
        assert!(is_builtin_class("Exception"));
        assert!(!is_builtin_class("len"));
    }
}
