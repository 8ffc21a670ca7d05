// Copyright (c) 2021 The mead authors

//! Multi-type arena allocation

/// Generate a struct bundling one `typed_arena::Arena` per listed type.
///
/// Callers allocate through the named fields directly; the references
/// handed out stay valid until the whole bundle is dropped. The listed
/// types may borrow from the bundle's own lifetime parameter, which is
/// what lets arena-allocated nodes point at each other.
#[macro_export]
macro_rules! make_arenas {
    ($(#[$attr:meta])* pub struct $name:ident<$lt:lifetime> { $($field:ident: $ty:ty,)* }) => {
        $(#[$attr])*
        pub struct $name<$lt> {
            $(pub $field: ::typed_arena::Arena<$ty>,)*
        }

        impl<$lt> $name<$lt> {
            /// Create a new, empty set of arenas.
            pub fn new() -> Self {
                $name {
                    $($field: ::typed_arena::Arena::new(),)*
                }
            }
        }

        impl<$lt> Default for $name<$lt> {
            fn default() -> Self {
                $name::new()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct Node<'a> {
        prev: Option<&'a Node<'a>>,
    }

    make_arenas! {
        pub struct TestArenas<'a> {
            nodes: Node<'a>,
        }
    }

    #[test]
    fn arena_nodes_may_reference_each_other() {
        let arenas = TestArenas::new();
        let first: &Node = arenas.nodes.alloc(Node { prev: None });
        let second = arenas.nodes.alloc(Node { prev: Some(first) });
        assert!(second.prev.is_some());
        assert!(first.prev.is_none());
    }

    #[test]
    fn default_is_empty() {
        let arenas = TestArenas::default();
        assert_eq!(arenas.nodes.len(), 0);
    }
}
