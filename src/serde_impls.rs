//! JSON projection hooks.
//!
//! A map serializes as an array of `[key, value]` pairs and a set as an
//! array of members, both in insertion order. Deserializing goes back
//! through `set`/`add`, so equivalent keys in the input collapse with the
//! first key kept and the last value winning.

use crate::deep_eq::DeepEq;
use crate::map::DeepEqualMap;
use crate::set::DeepEqualSet;
use core::fmt;
use core::marker::PhantomData;
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, SerializeTuple, Serializer};

struct Pair<'a, K, V>(&'a K, &'a V);

impl<K: Serialize, V: Serialize> Serialize for Pair<'_, K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(self.0)?;
        tup.serialize_element(self.1)?;
        tup.end()
    }
}

impl<K: Serialize, V: Serialize> Serialize for DeepEqualMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for (k, v) in self {
            seq.serialize_element(&Pair(k, v))?;
        }
        seq.end()
    }
}

impl<T: Serialize> Serialize for DeepEqualSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self)
    }
}

struct MapVisitor<K, V>(PhantomData<fn() -> (K, V)>);

impl<'de, K, V> Visitor<'de> for MapVisitor<K, V>
where
    K: DeepEq + Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = DeepEqualMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of [key, value] pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut map = DeepEqualMap::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some((k, v)) = seq.next_element::<(K, V)>()? {
            map.set(k, v);
        }
        Ok(map)
    }
}

impl<'de, K, V> Deserialize<'de> for DeepEqualMap<K, V>
where
    K: DeepEq + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(MapVisitor(PhantomData))
    }
}

struct SetVisitor<T>(PhantomData<fn() -> T>);

impl<'de, T> Visitor<'de> for SetVisitor<T>
where
    T: DeepEq + Deserialize<'de>,
{
    type Value = DeepEqualSet<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of members")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut set = DeepEqualSet::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(member) = seq.next_element::<T>()? {
            set.add(member);
        }
        Ok(set)
    }
}

impl<'de, T> Deserialize<'de> for DeepEqualSet<T>
where
    T: DeepEq + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(SetVisitor(PhantomData))
    }
}
