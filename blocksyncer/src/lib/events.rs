// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Typed events.
//!
//! The chain emits every state change as an ABCI event whose type is the
//! full proto name of a message and whose attributes are the JSON encoded
//! fields of that message. [`Event::parse`] turns the events the syncer
//! knows into Rust values; any other event is left alone.

pub mod codec;
pub mod payment;
pub mod permission;
pub mod sp;
pub mod storage;
pub mod virtual_group;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use self::payment::*;
use self::permission::*;
use self::sp::*;
use self::storage::*;
use self::virtual_group::*;
use crate::chain::AbciEvent;
use crate::error::SyncError;

macro_rules! typed_events {
    ($( $variant:ident($ty:ty) = $constant:ident : $type_url:literal, )+) => {
        $(
            pub const $constant: &str = $type_url;
        )+

        /// Every event type the syncer understands.
        pub const ALL_EVENTS: &[&str] = &[$( $type_url ),+];

        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Event {
            $( $variant($ty), )+
        }

        impl Event {
            /// Decode `raw` if its type is known, `Ok(None)` otherwise.
            pub fn parse(raw: &AbciEvent) -> Result<Option<Self>, SyncError> {
                let event = match raw.kind.as_str() {
                    $( $type_url => Event::$variant(decode(raw)?), )+
                    _ => return Ok(None),
                };
                Ok(Some(event))
            }

            /// Full proto name of the event.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Event::$variant(_) => $type_url, )+
                }
            }
        }
    };
}

typed_events! {
    CreateBucket(EventCreateBucket) =
        EVENT_CREATE_BUCKET: "greenfield.storage.EventCreateBucket",
    DeleteBucket(EventDeleteBucket) =
        EVENT_DELETE_BUCKET: "greenfield.storage.EventDeleteBucket",
    UpdateBucketInfo(EventUpdateBucketInfo) =
        EVENT_UPDATE_BUCKET_INFO: "greenfield.storage.EventUpdateBucketInfo",
    DiscontinueBucket(EventDiscontinueBucket) =
        EVENT_DISCONTINUE_BUCKET: "greenfield.storage.EventDiscontinueBucket",
    MigrationBucket(EventMigrationBucket) =
        EVENT_MIGRATION_BUCKET: "greenfield.storage.EventMigrationBucket",
    CompleteMigrationBucket(EventCompleteMigrationBucket) =
        EVENT_COMPLETE_MIGRATION_BUCKET:
            "greenfield.storage.EventCompleteMigrationBucket",
    CancelMigrationBucket(EventEndMigrationBucket) =
        EVENT_CANCEL_MIGRATION_BUCKET:
            "greenfield.storage.EventCancelMigrationBucket",
    RejectMigrateBucket(EventEndMigrationBucket) =
        EVENT_REJECT_MIGRATE_BUCKET:
            "greenfield.storage.EventRejectMigrateBucket",
    ToggleSPAsDelegatedAgent(EventToggleSPAsDelegatedAgent) =
        EVENT_TOGGLE_SP_AS_DELEGATED_AGENT:
            "greenfield.storage.EventToggleSPAsDelegatedAgent",
    BucketFlowRateLimitStatus(EventBucketFlowRateLimitStatus) =
        EVENT_BUCKET_FLOW_RATE_LIMIT_STATUS:
            "greenfield.storage.EventBucketFlowRateLimitStatus",

    CreateObject(EventCreateObject) =
        EVENT_CREATE_OBJECT: "greenfield.storage.EventCreateObject",
    SealObject(EventSealObject) =
        EVENT_SEAL_OBJECT: "greenfield.storage.EventSealObject",
    CancelCreateObject(EventObjectRef) =
        EVENT_CANCEL_CREATE_OBJECT: "greenfield.storage.EventCancelCreateObject",
    CopyObject(EventCopyObject) =
        EVENT_COPY_OBJECT: "greenfield.storage.EventCopyObject",
    DeleteObject(EventDeleteObject) =
        EVENT_DELETE_OBJECT: "greenfield.storage.EventDeleteObject",
    RejectSealObject(EventRejectSealObject) =
        EVENT_REJECT_SEAL_OBJECT: "greenfield.storage.EventRejectSealObject",
    DiscontinueObject(EventDiscontinueObject) =
        EVENT_DISCONTINUE_OBJECT: "greenfield.storage.EventDiscontinueObject",
    UpdateObjectInfo(EventUpdateObjectInfo) =
        EVENT_UPDATE_OBJECT_INFO: "greenfield.storage.EventUpdateObjectInfo",
    UpdateObjectContent(EventUpdateObjectContent) =
        EVENT_UPDATE_OBJECT_CONTENT:
            "greenfield.storage.EventUpdateObjectContent",
    UpdateObjectContentSuccess(EventUpdateObjectContentSuccess) =
        EVENT_UPDATE_OBJECT_CONTENT_SUCCESS:
            "greenfield.storage.EventUpdateObjectContentSuccess",
    CancelUpdateObjectContent(EventObjectRef) =
        EVENT_CANCEL_UPDATE_OBJECT_CONTENT:
            "greenfield.storage.EventCancelUpdateObjectContent",

    CreateGroup(EventCreateGroup) =
        EVENT_CREATE_GROUP: "greenfield.storage.EventCreateGroup",
    DeleteGroup(EventDeleteGroup) =
        EVENT_DELETE_GROUP: "greenfield.storage.EventDeleteGroup",
    LeaveGroup(EventLeaveGroup) =
        EVENT_LEAVE_GROUP: "greenfield.storage.EventLeaveGroup",
    UpdateGroupMember(EventUpdateGroupMember) =
        EVENT_UPDATE_GROUP_MEMBER: "greenfield.storage.EventUpdateGroupMember",
    RenewGroupMember(EventRenewGroupMember) =
        EVENT_RENEW_GROUP_MEMBER: "greenfield.storage.EventRenewGroupMember",

    PutPolicy(EventPutPolicy) =
        EVENT_PUT_POLICY: "greenfield.permission.EventPutPolicy",
    DeletePolicy(EventDeletePolicy) =
        EVENT_DELETE_POLICY: "greenfield.permission.EventDeletePolicy",

    PaymentAccountUpdate(EventPaymentAccountUpdate) =
        EVENT_PAYMENT_ACCOUNT_UPDATE:
            "greenfield.payment.EventPaymentAccountUpdate",
    StreamRecordUpdate(EventStreamRecordUpdate) =
        EVENT_STREAM_RECORD_UPDATE: "greenfield.payment.EventStreamRecordUpdate",

    CreateStorageProvider(EventCreateStorageProvider) =
        EVENT_CREATE_STORAGE_PROVIDER: "greenfield.sp.EventCreateStorageProvider",
    EditStorageProvider(EventEditStorageProvider) =
        EVENT_EDIT_STORAGE_PROVIDER: "greenfield.sp.EventEditStorageProvider",
    SpStoragePriceUpdate(EventSpStoragePriceUpdate) =
        EVENT_SP_STORAGE_PRICE_UPDATE: "greenfield.sp.EventSpStoragePriceUpdate",

    StorageProviderExit(EventStorageProviderExit) =
        EVENT_STORAGE_PROVIDER_EXIT:
            "greenfield.virtualgroup.EventStorageProviderExit",
    CompleteStorageProviderExit(EventCompleteStorageProviderExit) =
        EVENT_COMPLETE_STORAGE_PROVIDER_EXIT:
            "greenfield.virtualgroup.EventCompleteStorageProviderExit",
    SwapOut(EventSwapOut) =
        EVENT_SWAP_OUT: "greenfield.virtualgroup.EventSwapOut",
    CompleteSwapOut(EventCompleteSwapOut) =
        EVENT_COMPLETE_SWAP_OUT: "greenfield.virtualgroup.EventCompleteSwapOut",
    CancelSwapOut(EventSwapOut) =
        EVENT_CANCEL_SWAP_OUT: "greenfield.virtualgroup.EventCancelSwapOut",

    CreateLocalVirtualGroup(EventLocalVirtualGroup) =
        EVENT_CREATE_LOCAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventCreateLocalVirtualGroup",
    UpdateLocalVirtualGroup(EventLocalVirtualGroup) =
        EVENT_UPDATE_LOCAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventUpdateLocalVirtualGroup",
    DeleteLocalVirtualGroup(EventDeleteLocalVirtualGroup) =
        EVENT_DELETE_LOCAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventDeleteLocalVirtualGroup",
    CreateGlobalVirtualGroup(EventCreateGlobalVirtualGroup) =
        EVENT_CREATE_GLOBAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventCreateGlobalVirtualGroup",
    UpdateGlobalVirtualGroup(EventUpdateGlobalVirtualGroup) =
        EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventUpdateGlobalVirtualGroup",
    DeleteGlobalVirtualGroup(EventDeleteById) =
        EVENT_DELETE_GLOBAL_VIRTUAL_GROUP:
            "greenfield.virtualgroup.EventDeleteGlobalVirtualGroup",
    CreateGlobalVirtualGroupFamily(EventCreateGlobalVirtualGroupFamily) =
        EVENT_CREATE_GLOBAL_VIRTUAL_GROUP_FAMILY:
            "greenfield.virtualgroup.EventCreateGlobalVirtualGroupFamily",
    UpdateGlobalVirtualGroupFamily(EventUpdateGlobalVirtualGroupFamily) =
        EVENT_UPDATE_GLOBAL_VIRTUAL_GROUP_FAMILY:
            "greenfield.virtualgroup.EventUpdateGlobalVirtualGroupFamily",
    DeleteGlobalVirtualGroupFamily(EventDeleteById) =
        EVENT_DELETE_GLOBAL_VIRTUAL_GROUP_FAMILY:
            "greenfield.virtualgroup.EventDeleteGlobalVirtualGroupFamily",
}

/// Build the JSON object of a typed event from its attributes and decode
/// it. A value that is not valid JSON is taken as a bare string.
fn decode<T: DeserializeOwned>(raw: &AbciEvent) -> Result<T, SyncError> {
    let object: Map<String, Value> = raw
        .attributes
        .iter()
        .map(|attr| {
            let value = serde_json::from_str(&attr.value)
                .unwrap_or_else(|_| Value::String(attr.value.clone()));
            (attr.key.clone(), value)
        })
        .collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| SyncError::parse(&raw.kind, e))
}
