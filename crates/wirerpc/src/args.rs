//! # Argument Lists
//!
//! Positional arguments are a Rust tuple. The tuple type is fixed by the
//! typed stub on one side and the skeleton on the other, so arity and
//! argument types are checked by the compiler; the runtime check below only
//! guards against peers built from a different signature.

use wirepack::Decoder;
use wirepack::Encoder;
use wirepack::ListIter;
use wirepack::Pack;
use wirepack::Unpack;

use crate::error::Error;
use crate::error::Result;

/// A fixed-arity argument tuple, encoded as `List[arg0, arg1, ...]`.
pub trait ArgList: Sized {
    /// Number of declared parameters.
    const ARITY: usize;

    /// Writes the arguments as a single List item.
    fn pack_args(&self, enc: &mut Encoder) -> wirepack::Result<()>;

    /// Reads the arguments strictly in declared order.
    ///
    /// # Errors
    /// `Error::ArgumentCount` when the List holds fewer or more items than
    /// `ARITY`.
    fn unpack_args(dec: &mut Decoder<'_>) -> Result<Self>;
}

fn next_arg<T: Unpack>(items: &mut ListIter<'_>, expected: usize, index: usize) -> Result<T> {
    let mut view = items.next().ok_or(Error::ArgumentCount { expected, found: index })??;
    let value = T::unpack(&mut view)?;
    view.finish()?;
    Ok(value)
}

fn no_more_args(items: &ListIter<'_>, expected: usize) -> Result<()> {
    match items.count_remaining()? {
        0 => Ok(()),
        extra => Err(Error::ArgumentCount { expected, found: expected + extra }),
    }
}

impl ArgList for () {
    const ARITY: usize = 0;

    fn pack_args(&self, enc: &mut Encoder) -> wirepack::Result<()> {
        enc.list_begin()?;
        enc.list_end()
    }

    fn unpack_args(dec: &mut Decoder<'_>) -> Result<Self> {
        let items = dec.list()?;
        no_more_args(&items, 0)
    }
}

macro_rules! arg_list {
    ($arity:expr; $($name:ident . $idx:tt),+) => {
        impl<$($name: Pack + Unpack),+> ArgList for ($($name,)+) {
            const ARITY: usize = $arity;

            fn pack_args(&self, enc: &mut Encoder) -> wirepack::Result<()> {
                enc.list_begin()?;
                $( self.$idx.pack(enc)?; )+
                enc.list_end()
            }

            fn unpack_args(dec: &mut Decoder<'_>) -> Result<Self> {
                let mut items = dec.list()?;
                let args = ($( next_arg::<$name>(&mut items, $arity, $idx)?, )+);
                no_more_args(&items, $arity)?;
                Ok(args)
            }
        }
    };
}

arg_list!(1; A.0);
arg_list!(2; A.0, B.1);
arg_list!(3; A.0, B.1, C.2);
arg_list!(4; A.0, B.1, C.2, D.3);
arg_list!(5; A.0, B.1, C.2, D.3, E.4);
arg_list!(6; A.0, B.1, C.2, D.3, E.4, F.5);
arg_list!(7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
arg_list!(8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
