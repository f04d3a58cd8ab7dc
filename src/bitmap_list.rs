use crate::slice_bitmap::{Material, SliceBitmap};

/// An ordered set of material-tagged slice bitmaps for one layer.
///
/// Empty bitmaps are never stored. Order is insertion order and is kept
/// through every operation for deterministic output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitmapList {
    entries: Vec<SliceBitmap>,
}

impl BitmapList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bitmaps<I: IntoIterator<Item = SliceBitmap>>(bitmaps: I) -> Self {
        let mut out = Self::new();
        for bm in bitmaps {
            out.push(bm);
        }
        out
    }

    pub fn push(&mut self, bitmap: SliceBitmap) {
        if !bitmap.is_empty() {
            self.entries.push(bitmap);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SliceBitmap> {
        self.entries.iter()
    }

    /// First entry with the given material tag.
    pub fn get(&self, material: Option<&Material>) -> Option<&SliceBitmap> {
        self.entries.iter().find(|e| e.material() == material)
    }

    pub fn materials(&self) -> Vec<Option<&Material>> {
        let mut out: Vec<Option<&Material>> = Vec::new();
        for e in &self.entries {
            if !out.contains(&e.material()) {
                out.push(e.material());
            }
        }
        out
    }

    /// Union of every entry regardless of material.
    pub fn flatten(&self) -> SliceBitmap {
        self.entries
            .iter()
            .fold(SliceBitmap::Empty, |acc, e| acc.union(e))
    }

    /// Merge duplicate-material entries into one bitmap per material, at the
    /// position of that material's first entry.
    pub fn collapsed(&self) -> BitmapList {
        let mut out: Vec<SliceBitmap> = Vec::with_capacity(self.entries.len());
        for e in &self.entries {
            match out.iter_mut().find(|o| o.material() == e.material()) {
                Some(o) => *o = o.union(e),
                None => out.push(e.clone()),
            }
        }
        BitmapList::from_bitmaps(out)
    }

    /// Material-paired union. Entries without a counterpart are kept.
    pub fn union_all(&self, other: &BitmapList) -> BitmapList {
        if std::ptr::eq(self, other) {
            return self.clone();
        }
        let a = self.collapsed();
        let b = other.collapsed();
        let mut out = BitmapList::new();
        for e in a.iter() {
            match b.get(e.material()) {
                Some(o) => out.push(e.union(o)),
                None => out.push(e.clone()),
            }
        }
        for o in b.iter() {
            if a.get(o.material()).is_none() {
                out.push(o.clone());
            }
        }
        out.collapsed()
    }

    /// Material-paired intersection. Entries without a counterpart are
    /// dropped.
    pub fn intersection_all(&self, other: &BitmapList) -> BitmapList {
        if std::ptr::eq(self, other) {
            return self.clone();
        }
        let a = self.collapsed();
        let b = other.collapsed();
        let mut out = BitmapList::new();
        for e in a.iter() {
            if let Some(o) = b.get(e.material()) {
                out.push(e.intersection(o));
            }
        }
        out.collapsed()
    }

    /// Subtract from each entry of `self` the same-material entry of `other`.
    /// Entries of `other` without a counterpart are ignored.
    pub fn difference_all(&self, other: &BitmapList) -> BitmapList {
        if std::ptr::eq(self, other) {
            return BitmapList::new();
        }
        let a = self.collapsed();
        let b = other.collapsed();
        let mut out = BitmapList::new();
        for e in a.iter() {
            match b.get(e.material()) {
                Some(o) => out.push(e.difference(o)),
                None => out.push(e.clone()),
            }
        }
        out
    }

    /// Per-material content equality, ignoring grid extents and entry order.
    pub fn same_content(&self, other: &BitmapList) -> bool {
        let a = self.collapsed();
        let b = other.collapsed();
        a.len() == b.len()
            && a.iter()
                .all(|e| b.get(e.material()).is_some_and(|o| e.same_content(o)))
    }
}

impl<'a> IntoIterator for &'a BitmapList {
    type Item = &'a SliceBitmap;
    type IntoIter = std::slice::Iter<'a, SliceBitmap>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::square_bitmap;

    fn sq(x: f64, y: f64, size: f64, mat: &str) -> SliceBitmap {
        square_bitmap(x, y, size, 1.0, Some(Material::new(mat)))
    }

    fn m(name: &str) -> Material {
        Material::new(name)
    }

    #[test]
    fn union_of_disjoint_materials_is_concatenation() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla")]);
        let b = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "abs"), sq(9.0, 0.0, 2.0, "pva")]);
        let u = a.union_all(&b);
        assert_eq!(u.len(), 3);
        assert_eq!(u.materials(), vec![Some(&m("pla")), Some(&m("abs")), Some(&m("pva"))]);
        assert_eq!(u.get(Some(&m("abs"))), b.get(Some(&m("abs"))));
    }

    #[test]
    fn union_pairs_same_material() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla")]);
        let b = BitmapList::from_bitmaps([sq(2.0, 0.0, 4.0, "pla")]);
        let u = a.union_all(&b);
        assert_eq!(u.len(), 1);
        assert_eq!(u.get(Some(&m("pla"))).map(SliceBitmap::solid_count), Some(24));
    }

    #[test]
    fn intersection_drops_unpaired_entries() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla"), sq(0.0, 0.0, 4.0, "abs")]);
        let b = BitmapList::from_bitmaps([sq(2.0, 2.0, 4.0, "pla"), sq(0.0, 0.0, 4.0, "pva")]);
        let i = a.intersection_all(&b);
        assert_eq!(i.len(), 1);
        assert_eq!(i.get(Some(&m("pla"))).map(SliceBitmap::solid_count), Some(4));
        assert!(i.get(Some(&m("abs"))).is_none());
        assert!(i.get(Some(&m("pva"))).is_none());
    }

    #[test]
    fn difference_keeps_unpaired_left_and_ignores_unpaired_right() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla"), sq(0.0, 0.0, 4.0, "abs")]);
        let b = BitmapList::from_bitmaps([sq(0.0, 0.0, 2.0, "pla"), sq(0.0, 0.0, 4.0, "pva")]);
        let d = a.difference_all(&b);
        assert_eq!(d.len(), 2);
        assert_eq!(d.get(Some(&m("pla"))).map(SliceBitmap::solid_count), Some(12));
        assert_eq!(d.get(Some(&m("abs"))), a.get(Some(&m("abs"))));
        assert!(d.get(Some(&m("pva"))).is_none());
    }

    #[test]
    fn fully_subtracted_entries_disappear() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla")]);
        let copy = a.clone();
        assert!(a.difference_all(&copy).is_empty());
        assert!(a.difference_all(&a).is_empty());
    }

    #[test]
    fn same_reference_short_circuits() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 4.0, "pla"), sq(8.0, 0.0, 2.0, "abs")]);
        assert_eq!(a.union_all(&a), a);
        assert_eq!(a.intersection_all(&a), a);
    }

    #[test]
    fn duplicate_materials_collapse() {
        let a = BitmapList::from_bitmaps([
            sq(0.0, 0.0, 2.0, "pla"),
            sq(5.0, 0.0, 2.0, "abs"),
            sq(10.0, 0.0, 2.0, "pla"),
        ]);
        let c = a.collapsed();
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(Some(&m("pla"))).map(SliceBitmap::solid_count), Some(8));
        assert_eq!(c.materials(), vec![Some(&m("pla")), Some(&m("abs"))]);
    }

    #[test]
    fn list_algebra_is_associative() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 6.0, "pla"), sq(0.0, 10.0, 3.0, "abs")]);
        let b = BitmapList::from_bitmaps([sq(3.0, 3.0, 6.0, "pla"), sq(1.0, 11.0, 3.0, "abs")]);
        let c = BitmapList::from_bitmaps([sq(1.0, 1.0, 4.0, "pla"), sq(0.0, 20.0, 2.0, "pva")]);

        let l = a.union_all(&b).union_all(&c);
        let r = a.union_all(&b.union_all(&c));
        assert!(l.same_content(&r));

        let l = a.intersection_all(&b).intersection_all(&c);
        let r = a.intersection_all(&b.intersection_all(&c));
        assert!(l.same_content(&r));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn flatten_ignores_materials() {
        let a = BitmapList::from_bitmaps([sq(0.0, 0.0, 2.0, "pla"), sq(1.0, 0.0, 2.0, "abs")]);
        assert_eq!(a.flatten().solid_count(), 6);
        assert!(BitmapList::new().flatten().is_empty());
    }
}
