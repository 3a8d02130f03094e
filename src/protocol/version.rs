//! Supported protocol revisions.
//!
//! Declaration order is release order, so the derived `Ord` answers questions
//! like "is this client at least 1.19.3" directly.

use std::fmt;

macro_rules! protocol_versions {
    ($($variant:ident => ($protocol:expr, $name:expr)),+ $(,)?) => {
        /// A supported wire protocol revision
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ProtocolVersion {
            $($variant),+
        }

        impl ProtocolVersion {
            /// Every supported revision, oldest first
            pub const ALL: &'static [ProtocolVersion] = &[$(ProtocolVersion::$variant),+];

            /// Protocol number sent in the handshake
            pub const fn protocol(self) -> i32 {
                match self {
                    $(ProtocolVersion::$variant => $protocol),+
                }
            }

            /// Release name, e.g. `1.19.3`
            pub const fn name(self) -> &'static str {
                match self {
                    $(ProtocolVersion::$variant => $name),+
                }
            }
        }
    };
}

protocol_versions! {
    V1_7_2 => (4, "1.7.2"),
    V1_7_6 => (5, "1.7.6"),
    V1_8 => (47, "1.8"),
    V1_9 => (107, "1.9"),
    V1_9_1 => (108, "1.9.1"),
    V1_9_2 => (109, "1.9.2"),
    V1_9_4 => (110, "1.9.4"),
    V1_10 => (210, "1.10"),
    V1_11 => (315, "1.11"),
    V1_11_1 => (316, "1.11.1"),
    V1_12 => (335, "1.12"),
    V1_12_1 => (338, "1.12.1"),
    V1_12_2 => (340, "1.12.2"),
    V1_13 => (393, "1.13"),
    V1_13_1 => (401, "1.13.1"),
    V1_13_2 => (404, "1.13.2"),
    V1_14 => (477, "1.14"),
    V1_14_1 => (480, "1.14.1"),
    V1_14_2 => (485, "1.14.2"),
    V1_14_3 => (490, "1.14.3"),
    V1_14_4 => (498, "1.14.4"),
    V1_15 => (573, "1.15"),
    V1_15_1 => (575, "1.15.1"),
    V1_15_2 => (578, "1.15.2"),
    V1_16 => (735, "1.16"),
    V1_16_1 => (736, "1.16.1"),
    V1_16_2 => (751, "1.16.2"),
    V1_16_3 => (753, "1.16.3"),
    V1_16_4 => (754, "1.16.4"),
    V1_17 => (755, "1.17"),
    V1_17_1 => (756, "1.17.1"),
    V1_18 => (757, "1.18"),
    V1_18_2 => (758, "1.18.2"),
    V1_19 => (759, "1.19"),
    V1_19_1 => (760, "1.19.1"),
    V1_19_3 => (761, "1.19.3"),
    V1_19_4 => (762, "1.19.4"),
    V1_20 => (763, "1.20"),
    V1_20_2 => (764, "1.20.2"),
    V1_20_3 => (765, "1.20.3"),
    V1_20_5 => (766, "1.20.5"),
    V1_21 => (767, "1.21"),
}

impl ProtocolVersion {
    /// Oldest supported revision
    pub const MINIMUM: ProtocolVersion = ProtocolVersion::V1_7_2;

    /// Newest supported revision
    pub const LATEST: ProtocolVersion = ProtocolVersion::V1_21;

    /// Look up a revision by the protocol number from the handshake
    pub fn from_protocol(protocol: i32) -> Option<Self> {
        Self::ALL
            .binary_search_by_key(&protocol, |v| v.protocol())
            .ok()
            .map(|i| Self::ALL[i])
    }

    /// Position in [`ProtocolVersion::ALL`]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// The revision released right after this one
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// True for `from..=to`
    pub fn between(self, from: Self, to: Self) -> bool {
        from <= self && self <= to
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.protocol())
    }
}
