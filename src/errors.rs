// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(missing_docs)]

pub use crate::encode::errors as encode_errors;
pub use crate::raster::errors as raster_errors;

use std::path::PathBuf;

// see https://docs.rs/error-chain/0.12.4/error_chain/
#[cfg_attr(rustfmt, rustfmt_skip)]
error_chain! {
    links {
        RenderError(raster_errors::Error, raster_errors::ErrorKind)
        /// Rendering frames failed.
        ;

        EncodeError(encode_errors::Error, encode_errors::ErrorKind)
        /// Producing the overlay video failed.
        ;
    }

    foreign_links {
        Io(::std::io::Error)
        /// An I/O operation failed.
        ;

        Toml(::toml::de::Error)
        /// The configuration file is not valid TOML for this program.
        ;
    }

    errors {
        /// The input is not valid UTF-8.
        DecodingError {
            description("decoding subtitle bytes to UTF-8 failed")
            display("subtitle content is not valid UTF-8")
        }

        /// The file extension names no supported subtitle format.
        UnknownFileFormat {
            description("unknown file format, only SubRip (.srt) and WebVTT (.vtt) are supported")
        }

        /// A subtitle file could not be read or decoded.
        ReadInput(path: PathBuf) {
            description("reading subtitle file failed")
            display("reading subtitle file '{}' failed", path.display())
        }

        /// A color is not of the form `#RRGGBB`.
        InvalidColor(value: String) {
            description("invalid color")
            display("invalid color '{}', expected #RRGGBB", value)
        }

        /// A configuration file could not be read.
        ReadConfig(path: PathBuf) {
            description("reading configuration failed")
            display("reading configuration file '{}' failed", path.display())
        }
    }
}
