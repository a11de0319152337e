//! PSFB (PT 206) payload specific feedback messages, RFC 4585 section 6.3
//! and RFC 5104 section 4.3.

pub mod application_layer_feedback;
pub mod full_intra_request;
pub mod picture_loss_indication;
pub mod receiver_estimated_maximum_bitrate;
pub mod reference_picture_selection_indication;
pub mod slice_loss_indication;
pub mod temporal_spatial_tradeoff;
pub mod video_back_channel_message;
