// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity-creation ceremony shared by the Workers programs.
//!
//! Each step of the ceremony can fail on its own and is tagged with a
//! [`Stage`]. The first failure stops the ceremony and is reported as a
//! [`BootstrapError`]; the programs exit with [`Stage::exit_code`].
//!
//! ```text
//!  1 factory            7 topic "Workers"        13 writer / reader
//!  2 participant qos    8 pub/sub qos            14 endpoint qos finalize
//!  3 participant        9 publisher/subscriber   15 topic qos finalize
//!  4 type name         10 pub/sub qos finalize   16 sample buffer
//!  5 register type     11 endpoint qos           17 info buffer / write
//!  6 topic qos         12 topic qos overlay
//! ```

use crate::worker::{Worker, TOPIC_NAME};
use dcps::dds::qos::loaders::{YamlLoader, YamlQosDocument, YamlQosProfile};
use dcps::dds::{SampleInfoSeq, SampleSeq};
use dcps::dds::qos::QosRecord;
use dcps::prelude::{
    DataReader, DataReaderListener, DataReaderQos, DataWriter, DataWriterQos, DomainParticipant,
    DomainParticipantFactory, Publisher, StatusMask, Subscriber, Topic, TopicQos, TypeSupport,
};
use dcps::qos::liveliness::Liveliness;
use dcps::qos::time_based_filter::TimeBasedFilter;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Slots in the loaned sample buffer each subscriber installs.
pub const SAMPLE_CAPACITY: usize = 8;

/// One step of the ceremony.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Factory,
    ParticipantQos,
    Participant,
    TypeName,
    RegisterType,
    TopicQos,
    Topic,
    GroupQos,
    Group,
    GroupQosFinalize,
    EndpointQos,
    TopicQosOverlay,
    Endpoint,
    EndpointQosFinalize,
    TopicQosFinalize,
    SampleBuffer,
    InfoBuffer,
    /// A write the publish loop gave up on.
    Publish,
}

impl Stage {
    /// Process exit code reported when this stage fails.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Factory => 1,
            Stage::ParticipantQos => 2,
            Stage::Participant => 3,
            Stage::TypeName => 4,
            Stage::RegisterType => 5,
            Stage::TopicQos => 6,
            Stage::Topic => 7,
            Stage::GroupQos => 8,
            Stage::Group => 9,
            Stage::GroupQosFinalize => 10,
            Stage::EndpointQos => 11,
            Stage::TopicQosOverlay => 12,
            Stage::Endpoint => 13,
            Stage::EndpointQosFinalize => 14,
            Stage::TopicQosFinalize => 15,
            Stage::SampleBuffer => 16,
            Stage::InfoBuffer | Stage::Publish => 17,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Stage::Factory => "participant factory",
            Stage::ParticipantQos => "default participant QoS",
            Stage::Participant => "participant creation",
            Stage::TypeName => "type name lookup",
            Stage::RegisterType => "type registration",
            Stage::TopicQos => "default topic QoS",
            Stage::Topic => "topic creation",
            Stage::GroupQos => "default publisher/subscriber QoS",
            Stage::Group => "publisher/subscriber creation",
            Stage::GroupQosFinalize => "publisher/subscriber QoS finalize",
            Stage::EndpointQos => "default writer/reader QoS",
            Stage::TopicQosOverlay => "topic QoS overlay",
            Stage::Endpoint => "writer/reader creation",
            Stage::EndpointQosFinalize => "writer/reader QoS finalize",
            Stage::TopicQosFinalize => "topic QoS finalize",
            Stage::SampleBuffer => "sample buffer allocation",
            Stage::InfoBuffer => "sample info buffer allocation",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.exit_code(), self.describe())
    }
}

/// First failing step of a ceremony.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct BootstrapError {
    pub stage: Stage,
    pub source: dcps::Error,
}

impl BootstrapError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.stage.exit_code()
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, BootstrapError>;
}

impl<T> AtStage<T> for dcps::Result<T> {
    fn at(self, stage: Stage) -> Result<T, BootstrapError> {
        self.map_err(|source| {
            log::debug!("[bootstrap] {} failed: {}", stage, source);
            BootstrapError { stage, source }
        })
    }
}

/// YAML profile applied to the endpoint QoS after the topic overlay.
#[derive(Clone, Debug)]
pub struct QosFile {
    pub path: PathBuf,
    /// Profile name; the document's default profile when `None`.
    pub profile: Option<String>,
}

/// Knobs the programs expose on top of the default ceremony.
#[derive(Clone, Debug, Default)]
pub struct EndpointOptions {
    pub domain_id: u32,
    pub qos_file: Option<QosFile>,
    pub liveliness: Option<Liveliness>,
    /// Reader minimum separation; ignored on the writer side.
    pub time_based_filter: Option<TimeBasedFilter>,
}

impl EndpointOptions {
    #[must_use]
    pub fn on_domain(domain_id: u32) -> Self {
        Self {
            domain_id,
            ..Self::default()
        }
    }

    fn apply_to_writer(&self, qos: &mut DataWriterQos) -> dcps::Result<()> {
        if let Some(file) = &self.qos_file {
            let doc = YamlLoader::load_from_file(&file.path)?;
            profile_of(&doc, file)?.apply_to_writer(qos)?;
        }
        if let Some(liveliness) = self.liveliness {
            qos.liveliness = liveliness;
        }
        qos.validate()
    }

    fn apply_to_reader(&self, qos: &mut DataReaderQos) -> dcps::Result<()> {
        if let Some(file) = &self.qos_file {
            let doc = YamlLoader::load_from_file(&file.path)?;
            profile_of(&doc, file)?.apply_to_reader(qos)?;
        }
        if let Some(liveliness) = self.liveliness {
            qos.liveliness = liveliness;
        }
        if let Some(filter) = self.time_based_filter {
            qos.time_based_filter = filter;
        }
        qos.validate()
    }
}

fn profile_of<'a>(doc: &'a YamlQosDocument, file: &QosFile) -> dcps::Result<&'a YamlQosProfile> {
    match &file.profile {
        Some(name) => YamlLoader::get_profile(doc, name),
        None => YamlLoader::get_default_profile(doc),
    }
}

/// Participant, registered type and topic: stages 1 to 7.
struct Joined {
    factory: &'static DomainParticipantFactory,
    participant: DomainParticipant,
    topic: Topic<Worker>,
    topic_qos: TopicQos,
}

fn join(domain_id: u32) -> Result<Joined, BootstrapError> {
    let factory = DomainParticipantFactory::get_instance()
        .ok_or(dcps::Error::NotEnabled)
        .at(Stage::Factory)?;
    let participant_qos = factory
        .get_default_participant_qos()
        .at(Stage::ParticipantQos)?;
    let participant = factory
        .create_participant(domain_id, &participant_qos)
        .at(Stage::Participant)?;

    match declare_topic(&participant) {
        Ok((topic, topic_qos)) => {
            log::info!(
                "[bootstrap] joined domain {} on topic {}",
                domain_id,
                TOPIC_NAME
            );
            Ok(Joined {
                factory,
                participant,
                topic,
                topic_qos,
            })
        }
        Err(e) => {
            release(factory, &participant);
            Err(e)
        }
    }
}

/// Stages 4 to 7.
fn declare_topic(
    participant: &DomainParticipant,
) -> Result<(Topic<Worker>, TopicQos), BootstrapError> {
    let type_name = TypeSupport::<Worker>::get_type_name().at(Stage::TypeName)?;
    TypeSupport::<Worker>::register_type(participant, type_name).at(Stage::RegisterType)?;
    let topic_qos = participant.get_default_topic_qos().at(Stage::TopicQos)?;
    let topic = participant
        .create_topic::<Worker>(TOPIC_NAME, type_name, &topic_qos)
        .at(Stage::Topic)?;
    Ok((topic, topic_qos))
}

fn release(factory: &DomainParticipantFactory, participant: &DomainParticipant) {
    if let Err(e) = participant.delete_contained_entities() {
        log::warn!("[bootstrap] delete_contained_entities: {}", e);
    }
    if let Err(e) = factory.delete_participant(participant) {
        log::warn!("[bootstrap] delete_participant: {}", e);
    }
}

/// Writing side of the ceremony.
pub struct PublisherSide {
    factory: &'static DomainParticipantFactory,
    pub participant: DomainParticipant,
    pub topic: Topic<Worker>,
    pub publisher: Publisher,
    pub writer: DataWriter<Worker>,
}

impl PublisherSide {
    /// Run stages 1 to 15 and return the ready writer.
    pub fn bootstrap(options: &EndpointOptions) -> Result<Self, BootstrapError> {
        let joined = join(options.domain_id)?;
        match Self::attach(&joined, options) {
            Ok((publisher, writer)) => Ok(Self {
                factory: joined.factory,
                participant: joined.participant,
                topic: joined.topic,
                publisher,
                writer,
            }),
            Err(e) => {
                release(joined.factory, &joined.participant);
                Err(e)
            }
        }
    }

    fn attach(
        joined: &Joined,
        options: &EndpointOptions,
    ) -> Result<(Publisher, DataWriter<Worker>), BootstrapError> {
        let pub_qos = joined
            .participant
            .get_default_publisher_qos()
            .at(Stage::GroupQos)?;
        let publisher = joined
            .participant
            .create_publisher(&pub_qos)
            .at(Stage::Group)?;
        pub_qos.finalize().at(Stage::GroupQosFinalize)?;

        let mut writer_qos = publisher
            .get_default_datawriter_qos()
            .at(Stage::EndpointQos)?;
        publisher
            .copy_from_topic_qos(&mut writer_qos, &joined.topic_qos)
            .and_then(|()| options.apply_to_writer(&mut writer_qos))
            .at(Stage::TopicQosOverlay)?;
        let writer = publisher
            .create_datawriter(&joined.topic, &writer_qos, None, StatusMask::NONE)
            .at(Stage::Endpoint)?;
        writer_qos.finalize().at(Stage::EndpointQosFinalize)?;
        joined
            .topic_qos
            .clone()
            .finalize()
            .at(Stage::TopicQosFinalize)?;

        log::info!(
            "[bootstrap] writer ready (liveliness {:?}, lease {:?})",
            writer.get_qos().liveliness.kind,
            writer.get_qos().liveliness.lease_duration
        );
        Ok((publisher, writer))
    }

    /// Delete the participant and everything it owns.
    pub fn close(self) {
        release(self.factory, &self.participant);
    }
}

/// Reading side of the ceremony.
pub struct SubscriberSide {
    factory: &'static DomainParticipantFactory,
    pub participant: DomainParticipant,
    pub topic: Topic<Worker>,
    pub subscriber: Subscriber,
    pub reader: DataReader<Worker>,
}

impl SubscriberSide {
    /// Run stages 1 to 17 and return the ready reader.
    ///
    /// The listener is installed last, once the reader owns its
    /// [`SAMPLE_CAPACITY`]-slot buffer, so a callback never takes from the
    /// default buffer.
    pub fn bootstrap(
        options: &EndpointOptions,
        listener: Option<Arc<dyn DataReaderListener<Worker>>>,
        mask: StatusMask,
    ) -> Result<Self, BootstrapError> {
        let joined = join(options.domain_id)?;
        match Self::attach(&joined, options, listener, mask) {
            Ok((subscriber, reader)) => Ok(Self {
                factory: joined.factory,
                participant: joined.participant,
                topic: joined.topic,
                subscriber,
                reader,
            }),
            Err(e) => {
                release(joined.factory, &joined.participant);
                Err(e)
            }
        }
    }

    fn attach(
        joined: &Joined,
        options: &EndpointOptions,
        listener: Option<Arc<dyn DataReaderListener<Worker>>>,
        mask: StatusMask,
    ) -> Result<(Subscriber, DataReader<Worker>), BootstrapError> {
        let sub_qos = joined
            .participant
            .get_default_subscriber_qos()
            .at(Stage::GroupQos)?;
        let subscriber = joined
            .participant
            .create_subscriber(&sub_qos)
            .at(Stage::Group)?;
        sub_qos.finalize().at(Stage::GroupQosFinalize)?;

        let mut reader_qos = subscriber
            .get_default_datareader_qos()
            .at(Stage::EndpointQos)?;
        subscriber
            .copy_from_topic_qos(&mut reader_qos, &joined.topic_qos)
            .and_then(|()| options.apply_to_reader(&mut reader_qos))
            .at(Stage::TopicQosOverlay)?;
        let reader = subscriber
            .create_datareader(&joined.topic, &reader_qos, None, StatusMask::NONE)
            .at(Stage::Endpoint)?;
        reader_qos.finalize().at(Stage::EndpointQosFinalize)?;
        joined
            .topic_qos
            .clone()
            .finalize()
            .at(Stage::TopicQosFinalize)?;

        let samples = SampleSeq::<Worker>::with_capacity(SAMPLE_CAPACITY).at(Stage::SampleBuffer)?;
        let infos = SampleInfoSeq::with_capacity(SAMPLE_CAPACITY).at(Stage::InfoBuffer)?;
        reader
            .install_sample_buffer(samples, infos)
            .at(Stage::InfoBuffer)?;

        if listener.is_some() {
            reader.set_listener(listener, mask).at(Stage::Endpoint)?;
        }

        log::info!(
            "[bootstrap] reader ready (liveliness {:?}, min separation {:?})",
            reader.get_qos().liveliness.kind,
            reader.get_qos().time_based_filter.minimum_separation
        );
        Ok((subscriber, reader))
    }

    /// Delete the participant and everything it owns.
    pub fn close(self) {
        release(self.factory, &self.participant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_ceremony_order() {
        let stages = [
            Stage::Factory,
            Stage::ParticipantQos,
            Stage::Participant,
            Stage::TypeName,
            Stage::RegisterType,
            Stage::TopicQos,
            Stage::Topic,
            Stage::GroupQos,
            Stage::Group,
            Stage::GroupQosFinalize,
            Stage::EndpointQos,
            Stage::TopicQosOverlay,
            Stage::Endpoint,
            Stage::EndpointQosFinalize,
            Stage::TopicQosFinalize,
            Stage::SampleBuffer,
            Stage::InfoBuffer,
        ];
        for (i, stage) in stages.iter().enumerate() {
            assert_eq!(stage.exit_code(), i as i32 + 1);
        }
        assert_eq!(Stage::Publish.exit_code(), 17);
    }

    #[test]
    fn test_error_display_names_stage() {
        let err = BootstrapError {
            stage: Stage::Topic,
            source: dcps::Error::NotEnabled,
        };
        let text = err.to_string();
        assert!(text.starts_with("stage 7 (topic creation) failed"));
        assert_eq!(err.exit_code(), 7);
        assert!(std::error::Error::source(&err).is_some());
    }
}
