//! Macros for ergonomic state tree construction.

/// Declare an enum of state identifiers.
///
/// Variants convert into [`StateId`](crate::core::StateId) through their
/// discriminant, so explicit discriminants pin the numeric ids.
///
/// # Example
///
/// ```
/// use hsm_engine::core::StateId;
/// use hsm_engine::state_ids;
///
/// state_ids! {
///     pub enum Player {
///         Top,
///         Idle,
///         Active,
///         Running = 10,
///         Paused,
///     }
/// }
///
/// assert_eq!(StateId::from(Player::Idle), StateId::new(1));
/// assert_eq!(Player::Running.id(), StateId::new(10));
/// assert_eq!(Player::Paused.id(), StateId::new(11));
/// assert_eq!(Player::from_id(StateId::new(2)), Some(Player::Active));
/// assert_eq!(Player::Paused.name(), "Paused");
/// assert_eq!(Player::ALL.len(), 5);
/// ```
#[macro_export]
macro_rules! state_ids {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $value:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(= $value)?
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            /// The state identifier of this variant.
            pub const fn id(self) -> $crate::core::StateId {
                $crate::core::StateId::new(self as u32)
            }

            /// The variant name, usable as a state display name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            /// The variant with identifier `id`, if any.
            pub fn from_id(id: $crate::core::StateId) -> Option<Self> {
                Self::ALL.iter().copied().find(|variant| variant.id() == id)
            }
        }

        impl From<$name> for $crate::core::StateId {
            fn from(state: $name) -> Self {
                state.id()
            }
        }
    };
}
