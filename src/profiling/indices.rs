use std::convert::TryInto;

macro_rules! count {
    () => { 0usize };
    ($head: ident $($tail: ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_markers {
    (pub enum $Name: ident { $($Variant: ident,)* }) => {
        /// Points in a frame at which a GPU timestamp is captured. Declaration order is the order in which the
        /// timestamps are expected to be issued; deltas are computed between neighbours.
        #[derive(serde::Deserialize, serde::Serialize, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub enum $Name {
            $($Variant,)*
        }

        impl $Name {
            pub const COUNT: usize = count!($($Variant)*);

            pub const ALL: [$Name; $Name::COUNT] = [$($Name::$Variant,)*];

            #[inline]
            pub fn index(self) -> usize {
                self as usize
            }

            #[inline]
            pub fn name(self) -> &'static str {
                match self {
                    $($Name::$Variant => stringify!($Variant),)*
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    }
}

impl_markers!(
    pub enum MarkerKind {
        FrameBegin,
        FrameInit,
        ZPass,
        ShadowCoverage,
        ShadowCast,
        MainPass,
        FrameEnd,
    }
);

/// One value per marker kind.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MarkerMap<T>([T; MarkerKind::COUNT]);

impl<T> MarkerMap<T> {
    pub fn try_from_fn<E, F>(mut f: F) -> Result<Self, E>
    where
        F: FnMut(MarkerKind) -> Result<T, E>,
    {
        let mut values = Vec::with_capacity(MarkerKind::COUNT);
        for &marker in MarkerKind::ALL.iter() {
            values.push(f(marker)?);
        }
        match values.try_into() {
            Ok(values) => Ok(MarkerMap(values)),
            Err(_) => unreachable!("pushed exactly one value per marker kind"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerKind, &T)> {
        MarkerKind::ALL.iter().copied().zip(self.0.iter())
    }
}

impl<T: Copy> MarkerMap<T> {
    pub fn fill(&mut self, value: T) {
        for v in self.0.iter_mut() {
            *v = value;
        }
    }
}

impl<T> std::ops::Index<MarkerKind> for MarkerMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, marker: MarkerKind) -> &Self::Output {
        &self.0[marker.index()]
    }
}

impl<T> std::ops::IndexMut<MarkerKind> for MarkerMap<T> {
    #[inline]
    fn index_mut(&mut self, marker: MarkerKind) -> &mut Self::Output {
        &mut self.0[marker.index()]
    }
}

/// Index into one of the two double-buffered capture sets.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Slot(u8);

impl Slot {
    pub const ZERO: Slot = Slot(0);
    pub const ONE: Slot = Slot(1);

    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn flipped(self) -> Self {
        Slot(self.0 ^ 1)
    }

    #[inline]
    pub fn flip(&mut self) {
        *self = self.flipped();
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SlotPair<T>([T; 2]);

impl<T> SlotPair<T> {
    pub fn try_from_fn<E, F>(mut f: F) -> Result<Self, E>
    where
        F: FnMut(Slot) -> Result<T, E>,
    {
        let zero = f(Slot::ZERO)?;
        let one = f(Slot::ONE)?;
        Ok(SlotPair([zero, one]))
    }
}

impl<T> std::ops::Index<Slot> for SlotPair<T> {
    type Output = T;

    #[inline]
    fn index(&self, slot: Slot) -> &Self::Output {
        &self.0[slot.to_usize()]
    }
}
