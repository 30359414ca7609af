/// 内存中的位图，记录其指示区域的槽位分配情况
#[derive(Debug)]
pub struct Bitmap {
    groups: Box<[u64]>,
    /// 可分配的槽位数
    capacity: usize,
}

impl Bitmap {
    pub fn new(capacity: usize) -> Self {
        let mut groups = vec![0u64; capacity.div_ceil(64)].into_boxed_slice();
        // 最后一组中超出容量的位预先置一，永不分配
        let tail = capacity % 64;
        if tail != 0 {
            if let Some(last) = groups.last_mut() {
                *last = u64::MAX << tail;
            }
        }

        Self { groups, capacity }
    }

    /// 分配编号最小的空闲槽位。
    /// 若位图已满，则返回空。
    pub fn alloc(&mut self) -> Option<usize> {
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != u64::MAX).then_some((group_index, bits.trailing_ones() as usize))
                })?;

        self.groups[group_index] |= 1 << ingroup_index;
        Some(group_index * 64 + ingroup_index)
    }

    pub fn dealloc(&mut self, index: usize) {
        assert!(index < self.capacity, "slot {index} is out of range");
        let (group_index, ingroup_index) = (index / 64, index % 64);

        // 编号一定得有对应的位
        assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "slot {index} has not been allocated"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    #[inline]
    pub fn is_allocated(&self, index: usize) -> bool {
        index < self.capacity && self.groups[index / 64] & (1 << (index % 64)) != 0
    }

    pub fn count_allocated(&self) -> usize {
        let padding = self.groups.len() * 64 - self.capacity;
        self.groups
            .iter()
            .map(|bits| bits.count_ones() as usize)
            .sum::<usize>()
            - padding
    }
}

#[cfg(test)]
mod tests {
    use super::Bitmap;

    #[test]
    fn alloc_until_full() {
        let mut bitmap = Bitmap::new(70);
        for expected in 0..70 {
            assert_eq!(bitmap.alloc(), Some(expected));
        }
        assert_eq!(bitmap.alloc(), None);
        assert_eq!(bitmap.count_allocated(), 70);
    }

    #[test]
    fn reuses_lowest_free_slot() {
        let mut bitmap = Bitmap::new(8);
        (0..5).for_each(|_| {
            bitmap.alloc();
        });
        bitmap.dealloc(3);
        bitmap.dealloc(1);
        assert!(!bitmap.is_allocated(1));
        assert_eq!(bitmap.alloc(), Some(1));
        assert_eq!(bitmap.alloc(), Some(3));
        assert_eq!(bitmap.alloc(), Some(5));
        assert_eq!(bitmap.count_allocated(), 6);
    }

    #[test]
    #[should_panic(expected = "has not been allocated")]
    fn double_free_panics() {
        let mut bitmap = Bitmap::new(4);
        let slot = bitmap.alloc().unwrap();
        bitmap.dealloc(slot);
        bitmap.dealloc(slot);
    }

    #[test]
    fn out_of_range_is_never_allocated() {
        let bitmap = Bitmap::new(3);
        assert!(!bitmap.is_allocated(3));
        assert!(!bitmap.is_allocated(64));
        assert_eq!(bitmap.count_allocated(), 0);
    }
}
