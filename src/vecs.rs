use std::{
    alloc,
    alloc::Layout,
    cmp::Ordering,
    fmt, mem,
    ops::{Deref, DerefMut},
    ptr,
    ptr::NonNull,
};

/// Basic vec, does not have own capacity or length, just a pointer to memory.
/// Kind-of cribbed from <https://doc.rust-lang.org/nomicon/vec/vec-final.html>.
struct BasicVec<T> {
    p: NonNull<T>,
}

unsafe impl<T: Send> Send for BasicVec<T> {}
unsafe impl<T: Sync> Sync for BasicVec<T> {}

impl<T> Default for BasicVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BasicVec<T> {
    /// Construct new `BasicVec`.
    pub fn new() -> Self {
        Self {
            p: NonNull::dangling(),
        }
    }

    /// Get mutable raw pointer to specified element.
    /// # Safety
    /// index must be < allocated capacity.
    #[inline]
    pub unsafe fn ix(&self, index: usize) -> *mut T {
        self.p.as_ptr().add(index)
    }

    /// Allocate memory for `cap` elements.
    ///
    /// Allocation failure is reported through [`alloc::handle_alloc_error`], which does not return.
    /// # Safety
    ///
    /// No memory must have been allocated yet.
    pub unsafe fn alloc(&mut self, cap: usize) {
        if mem::size_of::<T>() == 0 || cap == 0 {
            return;
        }
        let layout = Self::layout(cap);
        let new_ptr = alloc::alloc(layout);
        self.p = match NonNull::new(new_ptr.cast::<T>()) {
            Some(p) => p,
            None => alloc::handle_alloc_error(layout),
        };
    }

    /// Free memory.
    /// # Safety
    ///
    /// The capacity must be the one passed to alloc.
    pub unsafe fn free(&mut self, cap: usize) {
        let elem_size = mem::size_of::<T>();

        if cap != 0 && elem_size != 0 && self.p != NonNull::dangling() {
            alloc::dealloc(self.p.as_ptr().cast::<u8>(), Self::layout(cap));
            self.p = NonNull::dangling();
        }
    }

    fn layout(cap: usize) -> Layout {
        match Layout::array::<T>(cap) {
            Ok(layout) => layout,
            Err(_) => panic!("node capacity overflows the address space"),
        }
    }

    /// Set value.
    /// # Safety
    ///
    /// ix must be < capacity, and the element must be unset.
    #[inline]
    pub unsafe fn set(&mut self, ix: usize, elem: T) {
        ptr::write(self.ix(ix), elem);
    }

    /// Get value.
    /// # Safety
    ///
    /// ix must be less < capacity, and the element must have been set.
    #[inline]
    pub unsafe fn get(&mut self, ix: usize) -> T {
        ptr::read(self.ix(ix))
    }

    /// # Safety
    ///
    /// len must be <= capacity and 0..len elements must have been set.
    #[inline]
    pub unsafe fn slice(&self, len: usize) -> &[T] {
        std::slice::from_raw_parts(self.p.as_ptr(), len)
    }

    /// # Safety
    ///
    /// len must be <= capacity and 0..len elements must have been set.
    #[inline]
    pub unsafe fn slice_mut(&mut self, len: usize) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.p.as_ptr(), len)
    }

    /// Move elements (ranges may overlap).
    /// # Safety
    ///
    /// The set status of the elements changes in the obvious way. from, to and len must be in range.
    pub unsafe fn move_self(&mut self, from: usize, to: usize, len: usize) {
        ptr::copy(self.ix(from), self.ix(to), len);
    }

    /// Move elements from another `BasicVec`.
    /// # Safety
    ///
    /// The set status of the elements changes in the obvious way. from, to and len must be in range.
    pub unsafe fn move_from(&mut self, from: usize, src: &mut Self, to: usize, len: usize) {
        ptr::copy_nonoverlapping(src.ix(from), self.ix(to), len);
    }
}

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(any(debug_assertions, not(feature = "unsafe-optim")))]
macro_rules! safe_assert {
    ( $cond: expr ) => {
        assert!($cond)
    };
}

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(all(not(debug_assertions), feature = "unsafe-optim"))]
macro_rules! safe_assert {
    ( $cond: expr ) => {};
}

pub(crate) use safe_assert;

/// Vec with fixed capacity. The capacity is not stored, the owner passes it to
/// [`FixedCapVec::new`] and [`FixedCapVec::free`].
pub(crate) struct FixedCapVec<T> {
    len: usize,
    v: BasicVec<T>,
}

impl<T> Default for FixedCapVec<T> {
    fn default() -> Self {
        let v = BasicVec::new();
        Self { len: 0, v }
    }
}

impl<T> FixedCapVec<T> {
    pub fn new(cap: usize) -> Self {
        let mut v = BasicVec::new();
        unsafe {
            v.alloc(cap);
        }
        Self { len: 0, v }
    }

    /// Drop the elements and release the memory.
    pub fn free(&mut self, cap: usize) {
        let mut len = self.len;
        // Length goes first so a panicking element drop cannot lead to a double drop.
        self.len = 0;
        while len > 0 {
            len -= 1;
            unsafe {
                self.v.get(len);
            }
        }
        unsafe {
            self.v.free(cap);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// Capacity must be greater than len.
    #[inline]
    pub unsafe fn push(&mut self, value: T) {
        unsafe {
            self.v.set(self.len, value);
        }
        self.len += 1;
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            unsafe { Some(self.v.get(self.len)) }
        }
    }

    /// Insert at `at`, shifting the tail right by one.
    /// # Safety
    ///
    /// Capacity must be greater than len.
    pub unsafe fn insert(&mut self, at: usize, value: T) {
        safe_assert!(at <= self.len);
        unsafe {
            if at < self.len {
                self.v.move_self(at, at + 1, self.len - at);
            }
            self.v.set(at, value);
            self.len += 1;
        }
    }

    /// Remove element at `at`, shifting the tail left by one.
    pub fn remove(&mut self, at: usize) -> T {
        safe_assert!(at < self.len);
        unsafe {
            let result = self.v.get(at);
            self.v.move_self(at + 1, at, self.len - at - 1);
            self.len -= 1;
            result
        }
    }

    /// Replace element at `ix`, returning the old one.
    #[inline]
    pub fn replace(&mut self, ix: usize, value: T) -> T {
        mem::replace(self.ixm(ix), value)
    }

    /// Move elements `at..len` into a new vec with capacity `cap`.
    pub fn split_off(&mut self, at: usize, cap: usize) -> Self {
        safe_assert!(at <= self.len);
        let len = self.len - at;
        let mut result = Self::new(cap);
        unsafe {
            result.v.move_from(at, &mut self.v, 0, len);
        }
        result.len = len;
        self.len -= len;
        result
    }

    /// Move every element of `src` to the end of self, leaving `src` empty.
    /// # Safety
    ///
    /// Capacity must be at least `self.len() + src.len()`.
    pub unsafe fn append(&mut self, src: &mut Self) {
        unsafe {
            self.v.move_from(0, &mut src.v, self.len, src.len);
        }
        self.len += src.len;
        src.len = 0;
    }

    /// Move the last `n` elements of `src` to the front of self.
    /// # Safety
    ///
    /// Capacity must be at least `self.len() + n`.
    pub unsafe fn steal_back(&mut self, src: &mut Self, n: usize) {
        safe_assert!(n <= src.len);
        unsafe {
            self.v.move_self(0, n, self.len);
            self.v.move_from(src.len - n, &mut src.v, 0, n);
        }
        src.len -= n;
        self.len += n;
    }

    /// Move the first `n` elements of `src` to the end of self.
    /// # Safety
    ///
    /// Capacity must be at least `self.len() + n`.
    pub unsafe fn steal_front(&mut self, src: &mut Self, n: usize) {
        safe_assert!(n <= src.len);
        unsafe {
            self.v.move_from(0, &mut src.v, self.len, n);
            src.v.move_self(n, 0, src.len - n);
        }
        src.len -= n;
        self.len += n;
    }

    /// Get reference to ith element.
    #[inline]
    pub fn ix(&self, ix: usize) -> &T {
        safe_assert!(ix < self.len);
        unsafe { &*self.v.ix(ix) }
    }

    /// Get mutable reference to ith element.
    #[inline]
    pub fn ixm(&mut self, ix: usize) -> &mut T {
        safe_assert!(ix < self.len);
        unsafe { &mut *self.v.ix(ix) }
    }

    /// Linear scan for the first element `e` where `f(e)` is not `Greater`.
    ///
    /// `f` compares the probe with an element. Returns `Ok(i)` if element i is equal,
    /// otherwise `Err(i)` where i is the insertion point.
    pub fn search<F>(&self, mut f: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        for i in 0..self.len {
            match f(self.ix(i)) {
                Ordering::Greater => {}
                Ordering::Equal => return Ok(i),
                Ordering::Less => return Err(i),
            }
        }
        Err(self.len)
    }

    pub fn fc_iter(self, cap: usize) -> FixedCapIter<T> {
        FixedCapIter {
            start: 0,
            v: self,
            cap,
        }
    }
}

impl<T> Deref for FixedCapVec<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        let len: usize = FixedCapVec::len(self);
        unsafe { self.v.slice(len) }
    }
}

impl<T> DerefMut for FixedCapVec<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        let len: usize = FixedCapVec::len(self);
        unsafe { self.v.slice_mut(len) }
    }
}

impl<T> fmt::Debug for FixedCapVec<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Consuming iterator over a [`FixedCapVec`], frees the memory when dropped.
pub(crate) struct FixedCapIter<T> {
    start: usize,
    cap: usize,
    v: FixedCapVec<T>,
}

impl<T> Iterator for FixedCapIter<T> {
    type Item = T;
    fn next(&mut self) -> Option<Self::Item> {
        if self.start == self.v.len {
            None
        } else {
            let ix = self.start;
            self.start += 1;
            Some(unsafe { self.v.v.get(ix) })
        }
    }
}
impl<T> Drop for FixedCapIter<T> {
    fn drop(&mut self) {
        while self.next().is_some() {}
        self.v.len = 0;
        self.v.free(self.cap);
    }
}
