use std::fmt;

macro_rules! reference_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ".{}"), self.0)
            }
        }
    };
}

reference_id!(
    /// Reference to an actor document.
    ActorId,
    "Actor"
);
reference_id!(
    /// Reference to an ability or effect-carrying item.
    ItemId,
    "Item"
);
reference_id!(
    /// Reference to an effect embedded in an actor.
    EffectId,
    "ActiveEffect"
);
reference_id!(
    /// Reference to an action log entry (the result a consumed slot points at).
    MessageId,
    "Message"
);
