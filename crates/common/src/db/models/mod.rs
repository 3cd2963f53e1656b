//! SeaORM entity models
//!
//! Database entities for Fieldnotes

pub mod field;
pub mod participant;
pub mod record;
pub mod record_image;
pub mod record_participant;
pub mod record_tag;
pub mod tag;
pub mod tag_category;
pub mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    UserRole,
};

pub use field::{
    Entity as FieldEntity,
    Model as Field,
    ActiveModel as FieldActiveModel,
    Column as FieldColumn,
};

pub use participant::{
    Entity as ParticipantEntity,
    Model as Participant,
    ActiveModel as ParticipantActiveModel,
    Column as ParticipantColumn,
    DataSensitivity,
};

pub use tag_category::{
    Entity as TagCategoryEntity,
    Model as TagCategory,
    ActiveModel as TagCategoryActiveModel,
    Column as TagCategoryColumn,
    TagCategoryType,
};

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    ActiveModel as TagActiveModel,
    Column as TagColumn,
};

pub use record::{
    Entity as RecordEntity,
    Model as Record,
    ActiveModel as RecordActiveModel,
    Column as RecordColumn,
    RecordStatus,
    RecordType,
};

pub use record_image::{
    Entity as RecordImageEntity,
    Model as RecordImage,
    ActiveModel as RecordImageActiveModel,
    Column as RecordImageColumn,
};

pub use record_participant::{
    Entity as RecordParticipantEntity,
    ActiveModel as RecordParticipantActiveModel,
    Column as RecordParticipantColumn,
};

pub use record_tag::{
    Entity as RecordTagEntity,
    ActiveModel as RecordTagActiveModel,
    Column as RecordTagColumn,
};
